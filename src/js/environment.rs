use std::rc::Rc;

use anyhow::{Context as AnyhowContext, Result};
use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, IntoJs, Object, Value};
use tracing::{debug, error, trace};

use super::convert::bind_handles;
use super::runtime::QuickJsEngine;
use crate::config::ShimConfig;
use crate::dom::DispatchOutcome;
use crate::host::{Handle, Host, HostError, HostValue, Verb};

/// A QuickJS context with `document`, `Node`, `Event` and `console` installed.
///
/// All script-visible proxies reach the host through one global primitive,
/// `__shim_call(verb, ...args)`. Listener registrations live inside the
/// bootstrap closure, so each environment has its own registry.
pub struct ScriptEnvironment {
    engine: QuickJsEngine,
}

impl ScriptEnvironment {
    pub fn new(host: Rc<dyn Host>, config: &ShimConfig) -> Result<Self> {
        let engine = QuickJsEngine::new(config.max_pending_jobs)?;
        install_shim_bindings(&engine, host).context("failed to install DOM shim bindings")?;
        Ok(Self { engine })
    }

    pub fn eval(&self, source: &str, filename: &str) -> Result<()> {
        self.engine.eval(source, filename)
    }

    pub fn eval_with<V>(&self, source: &str, filename: &str) -> Result<V>
    where
        V: for<'js> rquickjs::FromJs<'js>,
    {
        self.engine.eval_with(source, filename)
    }

    /// Dispatch a fresh `Event(event_type)` on the node behind `handle`.
    pub fn dispatch_event(&self, handle: Handle, event_type: &str) -> Result<DispatchOutcome> {
        let outcome = self.engine.with_context(|ctx| {
            let shim: Object = ctx.globals().get("__shim")?;
            let dispatch: Function = shim.get("dispatchEvent")?;
            let result: Object = dispatch.call((handle, event_type))?;
            Ok(DispatchOutcome {
                do_default: result.get("do_default")?,
                stop_propagation: result.get("stop_propagation")?,
            })
        })?;
        self.engine.execute_pending_jobs();
        Ok(outcome)
    }

    pub fn listener_count(&self, handle: Handle, event_type: &str) -> Result<usize> {
        let count: i32 = self.engine.with_context(|ctx| {
            let shim: Object = ctx.globals().get("__shim")?;
            let count: Function = shim.get("listenerCount")?;
            count.call((handle, event_type))
        })?;
        Ok(count.max(0) as usize)
    }
}

fn install_shim_bindings(engine: &QuickJsEngine, host: Rc<dyn Host>) -> Result<()> {
    engine.with_context(|ctx| {
        install_host_call(&ctx, host)?;

        match ctx.eval::<(), _>(SHIM_BOOTSTRAP.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let rquickjs::Error::Exception = err {
                    let value: Value<'_> = ctx.catch();
                    error!(target: "quickjs", "DOM shim bootstrap failed: {:?}", value);
                }
                Err(err)
            }
        }
    })
}

fn install_host_call<'js>(ctx: &Ctx<'js>, host: Rc<dyn Host>) -> rquickjs::Result<()> {
    let func = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, verb: String, args: Rest<HostValue>| -> rquickjs::Result<HostValue> {
            forward_call(&ctx, host.as_ref(), &verb, args.0)
        },
    )?
    .with_name("__shim_call")?;
    ctx.globals().set("__shim_call", func)?;
    Ok(())
}

fn forward_call(
    ctx: &Ctx<'_>,
    host: &dyn Host,
    verb: &str,
    args: Vec<HostValue>,
) -> rquickjs::Result<HostValue> {
    let result = verb.parse::<Verb>().and_then(|verb| {
        let args = bind_handles(verb, args)?;
        trace!(target: "domshim", %verb, args = args.len(), "script host call");
        host.call(verb, args)
    });
    match result {
        Ok(reply) => Ok(reply),
        Err(err) => host_error(ctx, err),
    }
}

fn host_error<T>(ctx: &Ctx<'_>, err: HostError) -> rquickjs::Result<T> {
    debug!(target: "quickjs", error = %err, "host call failed");
    let value = format!("host call failed: {err}").into_js(ctx)?;
    Err(ctx.throw(value))
}

const SHIM_BOOTSTRAP: &str = r#"
(() => {
    const global = globalThis;
    const call = global.__shim_call;
    const listeners = new Map();

    function handlesToNodes(handles) {
        return handles.map((handle) => new Node(handle));
    }

    function transferable(value) {
        if (value == null) {
            return true;
        }
        if (Array.isArray(value)) {
            return value.every(transferable);
        }
        const kind = typeof value;
        return kind === 'string' || kind === 'number' || kind === 'boolean';
    }

    function bucketFor(handle, type, create) {
        let byType = listeners.get(handle);
        if (!byType) {
            if (!create) {
                return null;
            }
            byType = new Map();
            listeners.set(handle, byType);
        }
        let bucket = byType.get(type);
        if (!bucket && create) {
            bucket = [];
            byType.set(type, bucket);
        }
        return bucket ?? null;
    }

    function Node(handle) {
        this.handle = handle;
    }

    Object.defineProperty(Node.prototype, 'children', {
        get() {
            return handlesToNodes(call('get_children', this.handle));
        },
    });

    Object.defineProperty(Node.prototype, 'innerHTML', {
        set(value) {
            call('innerHTML_set', this.handle, '' + value);
        },
    });

    Node.prototype.getAttribute = function (name) {
        return call('getAttribute', this.handle, name);
    };

    Node.prototype.addEventListener = function (type, listener) {
        bucketFor(this.handle, type, true).push(listener);
    };

    Node.prototype.dispatchEvent = function (evt) {
        const bucket = bucketFor(this.handle, evt.type, false) ?? [];
        for (let i = 0; i < bucket.length; i++) {
            bucket[i].call(this, evt);
        }
        return { do_default: evt.do_default, stop_propagation: evt.stop_propagation };
    };

    Node.prototype.appendChild = function (child) {
        call('append_child', this.handle, child.handle);
        return child;
    };

    Node.prototype.insertBefore = function (node, reference) {
        if (reference == null) {
            return this.appendChild(node);
        }
        call('insert_before', this.handle, node.handle, reference.handle);
        return node;
    };

    function Event(type) {
        this.type = type;
        this.do_default = true;
        this.stop_propagation = false;
    }

    Event.prototype.preventDefault = function () {
        this.do_default = false;
    };

    Event.prototype.stopPropagation = function () {
        this.stop_propagation = true;
    };

    global.Node = Node;
    global.Event = Event;

    global.document = {
        querySelectorAll(selector) {
            return handlesToNodes(call('querySelectorAll', selector));
        },
        createElement(tag) {
            return new Node(call('create_element', tag));
        },
    };

    global.console = {
        log(value) {
            call('log', transferable(value) ? value : String(value));
        },
    };

    global.__shim = {
        dispatchEvent(handle, type) {
            return new Node(handle).dispatchEvent(new Event(type));
        },
        listenerCount(handle, type) {
            const bucket = bucketFor(handle, type, false);
            return bucket ? bucket.length : 0;
        },
    };
})();
"#;
