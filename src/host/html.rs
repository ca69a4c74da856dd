use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::*;
use kuchiki::{parse_fragment, parse_html, Node, NodeRef};
use tracing::info;

use super::{CallArgs, Handle, Host, HostError, HostValue, Verb};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// In-memory host backed by a parsed HTML tree.
///
/// Every node that crosses the boundary is assigned a handle the first time
/// it is seen and keeps that handle for the lifetime of the host, so two
/// queries that reach the same node reply with equal handles.
pub struct HtmlHost {
    document: NodeRef,
    nodes: RefCell<HashMap<Handle, NodeRef>>,
    handles: RefCell<HashMap<*const Node, Handle>>,
    next_handle: Cell<u64>,
    console: RefCell<Vec<String>>,
}

impl HtmlHost {
    pub fn new(html: &str) -> Self {
        Self {
            document: parse_html().one(html),
            nodes: RefCell::new(HashMap::new()),
            handles: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
            console: RefCell::new(Vec::new()),
        }
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.document.to_string()
    }

    /// Serialize one node, including its own tag.
    pub fn node_html(&self, handle: Handle) -> Result<String, HostError> {
        Ok(self.node(handle)?.to_string())
    }

    pub fn text_content(&self, handle: Handle) -> Result<String, HostError> {
        Ok(self.node(handle)?.text_contents())
    }

    /// Messages received through the `log` verb, oldest first.
    pub fn console_messages(&self) -> Vec<String> {
        self.console.borrow().clone()
    }

    fn handle_for(&self, node: &NodeRef) -> Handle {
        let key = Rc::as_ptr(&node.0);
        if let Some(handle) = self.handles.borrow().get(&key) {
            return *handle;
        }
        let handle = Handle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.handles.borrow_mut().insert(key, handle);
        self.nodes.borrow_mut().insert(handle, node.clone());
        handle
    }

    fn node(&self, handle: Handle) -> Result<NodeRef, HostError> {
        self.nodes
            .borrow()
            .get(&handle)
            .cloned()
            .ok_or(HostError::UnknownHandle(handle))
    }

    fn log(&self, value: &HostValue) {
        let message = value
            .coerce_to_string()
            .unwrap_or_else(|_| format!("{value:?}"));
        info!(target: "console", "{message}");
        self.console.borrow_mut().push(message);
    }

    fn query_selector_all(&self, selector: &str) -> Result<HostValue, HostError> {
        let matches = self
            .document
            .select(selector)
            .map_err(|()| HostError::InvalidSelector(selector.to_string()))?;
        let handles = matches
            .map(|element| HostValue::Handle(self.handle_for(element.as_node())))
            .collect();
        Ok(HostValue::List(handles))
    }

    fn create_element(&self, tag: &str) -> HostValue {
        let node = NodeRef::new_element(html_name(&tag.to_ascii_lowercase()), Vec::new());
        HostValue::Handle(self.handle_for(&node))
    }

    fn children(&self, handle: Handle) -> Result<HostValue, HostError> {
        let node = self.node(handle)?;
        let children = node
            .children()
            .filter(|child| child.as_element().is_some())
            .map(|child| HostValue::Handle(self.handle_for(&child)))
            .collect();
        Ok(HostValue::List(children))
    }

    fn get_attribute(&self, handle: Handle, name: &str) -> Result<HostValue, HostError> {
        let node = self.node(handle)?;
        let element = node.as_element().ok_or(HostError::NotAnElement(handle))?;
        let value = element
            .attributes
            .borrow()
            .get(name.to_ascii_lowercase().as_str())
            .map(str::to_string);
        Ok(value.into())
    }

    fn set_inner_html(&self, handle: Handle, markup: &str) -> Result<HostValue, HostError> {
        let node = self.node(handle)?;
        let context = node
            .as_element()
            .map(|element| element.name.clone())
            .unwrap_or_else(|| html_name("body"));
        let fragment = parse_fragment(context, Vec::new()).one(markup);
        // The fragment parser wraps the parsed nodes in a single `html` element.
        let root = fragment
            .first_child()
            .ok_or_else(|| HostError::Other("parsed markup has no root".to_string()))?;

        for child in node.children().collect::<Vec<_>>() {
            child.detach();
        }
        for child in root.children().collect::<Vec<_>>() {
            node.append(child);
        }
        Ok(HostValue::Null)
    }

    fn append_child(&self, parent: Handle, child: Handle) -> Result<HostValue, HostError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        ensure_not_ancestor(&parent_node, parent, &child_node, child)?;
        parent_node.append(child_node);
        Ok(HostValue::Null)
    }

    fn insert_before(
        &self,
        parent: Handle,
        new: Handle,
        reference: Handle,
    ) -> Result<HostValue, HostError> {
        let parent_node = self.node(parent)?;
        let new_node = self.node(new)?;
        let reference_node = self.node(reference)?;

        if reference_node.parent().as_ref() != Some(&parent_node) {
            return Err(HostError::NotAChild {
                parent,
                child: reference,
            });
        }
        ensure_not_ancestor(&parent_node, parent, &new_node, new)?;
        if new_node == reference_node {
            return Ok(HostValue::Null);
        }
        reference_node.insert_before(new_node);
        Ok(HostValue::Null)
    }
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

fn ensure_not_ancestor(
    parent: &NodeRef,
    parent_handle: Handle,
    child: &NodeRef,
    child_handle: Handle,
) -> Result<(), HostError> {
    if parent.inclusive_ancestors().any(|ancestor| &ancestor == child) {
        return Err(HostError::Other(format!(
            "node {child_handle} contains node {parent_handle}"
        )));
    }
    Ok(())
}

impl Host for HtmlHost {
    fn call(&self, verb: Verb, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        let args = CallArgs::new(verb, &args);
        match verb {
            Verb::Log => {
                self.log(args.value(0)?);
                Ok(HostValue::Null)
            }
            Verb::QuerySelectorAll => self.query_selector_all(args.string(0)?),
            Verb::CreateElement => Ok(self.create_element(args.string(0)?)),
            Verb::GetChildren => self.children(args.handle(0)?),
            Verb::GetAttribute => self.get_attribute(args.handle(0)?, args.string(1)?),
            Verb::InnerHtmlSet => self.set_inner_html(args.handle(0)?, args.string(1)?),
            Verb::AppendChild => self.append_child(args.handle(0)?, args.handle(1)?),
            Verb::InsertBefore => {
                self.insert_before(args.handle(0)?, args.handle(1)?, args.handle(2)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body><ul id="list"><li class="a">one</li> text <li class="b">two</li></ul></body></html>"#;

    fn handles(value: HostValue) -> Vec<Handle> {
        match value {
            HostValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    HostValue::Handle(handle) => handle,
                    other => panic!("expected handle, got {other:?}"),
                })
                .collect(),
            other => panic!("expected list, got {other:?}"),
        }
    }

    fn query(host: &HtmlHost, selector: &str) -> Vec<Handle> {
        handles(
            host.call(Verb::QuerySelectorAll, vec![selector.into()])
                .unwrap(),
        )
    }

    #[test]
    fn repeated_queries_reuse_handles() {
        let host = HtmlHost::new(PAGE);
        let first = query(&host, "li");
        let second = query(&host, "li");
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn children_skip_text_nodes() {
        let host = HtmlHost::new(PAGE);
        let list = query(&host, "#list")[0];
        let children = handles(
            host.call(Verb::GetChildren, vec![list.into()])
                .unwrap(),
        );
        assert_eq!(children, query(&host, "li"));
    }

    #[test]
    fn missing_attribute_is_null() {
        let host = HtmlHost::new(PAGE);
        let item = query(&host, "li.a")[0];
        let class = host
            .call(Verb::GetAttribute, vec![item.into(), "CLASS".into()])
            .unwrap();
        assert_eq!(class, HostValue::from("a"));
        let missing = host
            .call(Verb::GetAttribute, vec![item.into(), "title".into()])
            .unwrap();
        assert!(missing.is_null());
    }

    #[test]
    fn inner_html_replaces_children() {
        let host = HtmlHost::new(PAGE);
        let list = query(&host, "#list")[0];
        host.call(
            Verb::InnerHtmlSet,
            vec![list.into(), "<li class=\"c\">three</li>".into()],
        )
        .unwrap();
        assert_eq!(query(&host, "li").len(), 1);
        assert_eq!(host.text_content(list).unwrap(), "three");
    }

    #[test]
    fn inner_html_keeps_head_level_elements() {
        let host = HtmlHost::new(PAGE);
        let list = query(&host, "#list")[0];
        host.call(
            Verb::InnerHtmlSet,
            vec![list.into(), "<style>p{}</style><p>x</p>".into()],
        )
        .unwrap();
        assert_eq!(
            host.node_html(list).unwrap(),
            r#"<ul id="list"><style>p{}</style><p>x</p></ul>"#
        );

        host.call(Verb::InnerHtmlSet, vec![list.into(), "<script>1</script>".into()])
            .unwrap();
        assert_eq!(
            host.node_html(list).unwrap(),
            r#"<ul id="list"><script>1</script></ul>"#
        );
    }

    #[test]
    fn insert_before_requires_child_reference() {
        let host = HtmlHost::new(PAGE);
        let list = query(&host, "#list")[0];
        let body = query(&host, "body")[0];
        let created = match host.call(Verb::CreateElement, vec!["LI".into()]).unwrap() {
            HostValue::Handle(handle) => handle,
            other => panic!("expected handle, got {other:?}"),
        };

        let err = host
            .call(
                Verb::InsertBefore,
                vec![list.into(), created.into(), body.into()],
            )
            .unwrap_err();
        assert!(matches!(err, HostError::NotAChild { child, .. } if child == body));

        let first = query(&host, "li.a")[0];
        host.call(
            Verb::InsertBefore,
            vec![list.into(), created.into(), first.into()],
        )
        .unwrap();
        assert_eq!(query(&host, "li")[0], created);
        assert_eq!(host.node_html(created).unwrap(), "<li></li>");
    }

    #[test]
    fn append_rejects_cycles() {
        let host = HtmlHost::new(PAGE);
        let list = query(&host, "#list")[0];
        let item = query(&host, "li")[0];
        let err = host
            .call(Verb::AppendChild, vec![item.into(), list.into()])
            .unwrap_err();
        assert!(matches!(err, HostError::Other(_)));
    }

    #[test]
    fn unknown_handles_and_selectors_fail() {
        let host = HtmlHost::new(PAGE);
        assert!(matches!(
            host.call(Verb::GetChildren, vec![Handle(99).into()]),
            Err(HostError::UnknownHandle(Handle(99)))
        ));
        assert!(matches!(
            host.call(Verb::QuerySelectorAll, vec!["li[".into()]),
            Err(HostError::InvalidSelector(_))
        ));
    }

    #[test]
    fn log_collects_messages() {
        let host = HtmlHost::new(PAGE);
        host.call(Verb::Log, vec!["hello".into()]).unwrap();
        host.call(Verb::Log, vec![HostValue::from(2)]).unwrap();
        assert_eq!(host.console_messages(), vec!["hello", "2"]);
    }
}
