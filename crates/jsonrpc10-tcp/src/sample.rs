//! Procedures served by the `jsonrpc10-server` binary

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jsonrpc10::{Fault, FunctionProcedure, Params, Procedure, ProcedureCollection, procedure};
use serde_json::{Value, json};

/// Small demo API, useful for poking at a server by hand.
#[derive(Debug, Default)]
pub struct TestApi {
    calls: AtomicU64,
}

impl TestApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of procedure calls served so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProcedureCollection for TestApi {
    fn procedures(self: Arc<Self>) -> Vec<Arc<dyn Procedure>> {
        let echo = Arc::clone(&self);
        let add = Arc::clone(&self);
        let ping = Arc::clone(&self);
        let fail = Arc::clone(&self);
        let deny = Arc::clone(&self);
        let calls = Arc::clone(&self);

        vec![
            procedure("echo", move |params: Params| {
                echo.count();
                Ok(params.into_value())
            }),
            Arc::new(FunctionProcedure::positional("add", move |params: Params| {
                add.count();
                let (a, b): (i64, i64) = params.parse()?;
                let sum = a
                    .checked_add(b)
                    .ok_or_else(|| Fault::invalid_param_values(Some(json!("sum overflows"))))?;
                Ok(json!(sum))
            })),
            procedure("ping", move |_| {
                ping.count();
                Ok(json!("pong"))
            }),
            procedure("fail", move |params: Params| {
                fail.count();
                Err(Fault::procedure_exception(Some(params.into_value())).into())
            }),
            procedure("deny", move |_| {
                deny.count();
                Err(Fault::permission_denied(Some(json!("no"))).into())
            }),
            procedure("_calls", move |_| Ok(Value::from(calls.calls()))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpc10::{Dispatcher, ErrorCode};

    fn dispatcher() -> (Dispatcher, Arc<TestApi>) {
        let api = Arc::new(TestApi::new());
        let mut dispatcher = Dispatcher::new();
        dispatcher.register_collection(Arc::clone(&api), Some("test"));
        (dispatcher, api)
    }

    fn call(dispatcher: &Dispatcher, raw: &str) -> Result<Value, Fault> {
        let reply = dispatcher.dispatch(raw.as_bytes()).unwrap();
        dispatcher.serializer().decode_response(&reply).map(|r| r.result)
    }

    #[test]
    fn test_exports_public_procedures_only() {
        let (dispatcher, _) = dispatcher();
        assert_eq!(
            dispatcher.procedures().names(),
            vec!["test.add", "test.deny", "test.echo", "test.fail", "test.ping"]
        );
    }

    #[test]
    fn test_procedures() {
        let (dispatcher, api) = dispatcher();

        assert_eq!(
            call(&dispatcher, r#"{"method": "test.echo", "params": [1, "a"], "id": 1}"#).unwrap(),
            json!([1, "a"])
        );
        assert_eq!(
            call(&dispatcher, r#"{"method": "test.add", "params": [2, 3], "id": 2}"#).unwrap(),
            json!(5)
        );
        assert_eq!(
            call(&dispatcher, r#"{"method": "test.ping", "params": [], "id": 3}"#).unwrap(),
            json!("pong")
        );

        let fault = call(&dispatcher, r#"{"method": "test.fail", "params": ["why"], "id": 4}"#).unwrap_err();
        assert_eq!(fault.kind(), Some(ErrorCode::ProcedureException));
        assert_eq!(fault.data, Some(json!(["why"])));

        let fault = call(&dispatcher, r#"{"method": "test.deny", "params": [], "id": 5}"#).unwrap_err();
        assert_eq!(fault.kind(), Some(ErrorCode::PermissionDenied));

        assert_eq!(api.calls(), 5);
    }

    #[test]
    fn test_add_rejects_bad_params() {
        let (dispatcher, _) = dispatcher();

        let fault = call(&dispatcher, r#"{"method": "test.add", "params": ["x", 1], "id": 1}"#).unwrap_err();
        assert_eq!(fault.kind(), Some(ErrorCode::InvalidMethodParams));

        let raw = format!(r#"{{"method": "test.add", "params": [{}, 1], "id": 2}}"#, i64::MAX);
        let fault = call(&dispatcher, &raw).unwrap_err();
        assert_eq!(fault.kind(), Some(ErrorCode::InvalidParamValues));
    }
}
