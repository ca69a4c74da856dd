use rquickjs::{Ctx, FromJs, IntoJs, Value};

use crate::host::{Handle, HostError, HostValue, Verb};

impl<'js> FromJs<'js> for HostValue {
    fn from_js(_ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        if value.is_null() || value.is_undefined() {
            return Ok(HostValue::Null);
        }
        if let Some(flag) = value.as_bool() {
            return Ok(HostValue::Bool(flag));
        }
        if let Some(number) = value.as_number() {
            return Ok(HostValue::Number(number));
        }
        if let Some(string) = value.as_string() {
            return Ok(HostValue::String(string.to_string()?));
        }
        if let Some(array) = value.as_array() {
            let items = array
                .iter::<HostValue>()
                .collect::<rquickjs::Result<Vec<_>>>()?;
            return Ok(HostValue::List(items));
        }
        Err(rquickjs::Error::new_from_js(value.type_name(), "host value"))
    }
}

impl<'js> IntoJs<'js> for HostValue {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        match self {
            HostValue::Null => Ok(Value::new_null(ctx.clone())),
            HostValue::Bool(flag) => flag.into_js(ctx),
            HostValue::Number(number) => number.into_js(ctx),
            HostValue::String(string) => string.into_js(ctx),
            HostValue::Handle(handle) => handle.into_js(ctx),
            HostValue::List(items) => items.into_js(ctx),
        }
    }
}

/// Handles reach script as plain numbers.
impl<'js> IntoJs<'js> for Handle {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        (self.0 as f64).into_js(ctx)
    }
}

/// Turn the leading numeric arguments of a script call back into handles.
pub(crate) fn bind_handles(verb: Verb, args: Vec<HostValue>) -> Result<Vec<HostValue>, HostError> {
    let arity = verb.handle_arity();
    args.into_iter()
        .enumerate()
        .map(|(index, value)| {
            if index >= arity {
                return Ok(value);
            }
            match value {
                HostValue::Number(number) if number >= 0.0 && number.fract() == 0.0 => {
                    Ok(HostValue::Handle(Handle(number as u64)))
                }
                _ => Err(HostError::BadArguments {
                    verb,
                    index,
                    expected: "a node handle",
                }),
            }
        })
        .collect()
}
