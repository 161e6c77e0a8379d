use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::codec::{JsonCodec, SerdeJsonCodec};
use crate::error::{Fault, ProcedureError};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;
use crate::serializer::{Serializer, SerializerConfig};
use crate::types::{Params, ParamsShape, RequestId};

/// Reply sent when not even an internal-error reply can be encoded.
pub const FALLBACK_INTERNAL_ERROR: &[u8] =
    br#"{"result": null, "error": {"code": -32603, "message": "Internal error."}, "id": null}"#;

/// A callable exposed over JSON-RPC.
pub trait Procedure: Send + Sync {
    /// Name the procedure registers under when no explicit name is given
    fn name(&self) -> &str;

    /// Call shape this procedure accepts. Calls of any other shape are
    /// rejected with an invalid-parameters fault before `call` runs.
    fn accepts(&self) -> ParamsShape {
        ParamsShape::Any
    }

    fn call(&self, params: Params) -> Result<Value, ProcedureError>;
}

/// A closure-based procedure
pub struct FunctionProcedure<F>
where
    F: Fn(Params) -> Result<Value, ProcedureError> + Send + Sync,
{
    name: String,
    shape: ParamsShape,
    function: F,
}

impl<F> FunctionProcedure<F>
where
    F: Fn(Params) -> Result<Value, ProcedureError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, function: F) -> Self {
        Self {
            name: name.into(),
            shape: ParamsShape::Any,
            function,
        }
    }

    /// Procedure that only takes positional params
    pub fn positional(name: impl Into<String>, function: F) -> Self {
        Self::new(name, function).with_shape(ParamsShape::Positional)
    }

    /// Procedure that only takes named params
    pub fn named(name: impl Into<String>, function: F) -> Self {
        Self::new(name, function).with_shape(ParamsShape::Named)
    }

    pub fn with_shape(mut self, shape: ParamsShape) -> Self {
        self.shape = shape;
        self
    }
}

impl<F> Procedure for FunctionProcedure<F>
where
    F: Fn(Params) -> Result<Value, ProcedureError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> ParamsShape {
        self.shape
    }

    fn call(&self, params: Params) -> Result<Value, ProcedureError> {
        (self.function)(params)
    }
}

/// Shorthand for building a shared [`FunctionProcedure`].
pub fn procedure<F>(name: impl Into<String>, function: F) -> Arc<dyn Procedure>
where
    F: Fn(Params) -> Result<Value, ProcedureError> + Send + Sync + 'static,
{
    Arc::new(FunctionProcedure::new(name, function))
}

/// An object that exports a group of procedures.
///
/// The implementation lists every procedure it exposes; nothing is
/// discovered at runtime. Names starting with `_` are treated as private and
/// are not registered.
pub trait ProcedureCollection: Send + Sync + 'static {
    fn procedures(self: Arc<Self>) -> Vec<Arc<dyn Procedure>>;
}

/// Name → procedure mapping consulted during dispatch
#[derive(Clone, Default)]
pub struct ProcedureTable {
    procedures: HashMap<String, Arc<dyn Procedure>>,
}

impl ProcedureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the procedure it replaced (last one wins)
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        procedure: Arc<dyn Procedure>,
    ) -> Option<Arc<dyn Procedure>> {
        self.procedures.insert(name.into(), procedure)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Procedure>> {
        self.procedures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.procedures.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl fmt::Debug for ProcedureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Routes decoded requests to registered procedures and encodes the outcome.
///
/// Registration needs `&mut self` and dispatch only `&self`, so once a
/// dispatcher is shared (for example behind an `Arc`) its table is frozen and
/// concurrent dispatch is safe.
#[derive(Debug)]
pub struct Dispatcher<C = SerdeJsonCodec> {
    serializer: Serializer<C>,
    procedures: ProcedureTable,
}

impl Dispatcher<SerdeJsonCodec> {
    pub fn new() -> Self {
        Self::with_serializer(Serializer::new())
    }

    pub fn from_config(config: SerializerConfig) -> Self {
        Self::with_serializer(Serializer::from_config(config))
    }
}

impl Default for Dispatcher<SerdeJsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: JsonCodec> Dispatcher<C> {
    pub fn with_serializer(serializer: Serializer<C>) -> Self {
        Self {
            serializer,
            procedures: ProcedureTable::new(),
        }
    }

    pub fn serializer(&self) -> &Serializer<C> {
        &self.serializer
    }

    pub fn procedures(&self) -> &ProcedureTable {
        &self.procedures
    }

    /// Register a procedure under its own name
    pub fn register<P>(&mut self, procedure: P) -> &mut Self
    where
        P: Procedure + 'static,
    {
        let name = procedure.name().to_string();
        self.bind(name, Arc::new(procedure))
    }

    /// Register a procedure under an explicit name
    pub fn register_as<P>(&mut self, name: impl Into<String>, procedure: P) -> &mut Self
    where
        P: Procedure + 'static,
    {
        self.bind(name.into(), Arc::new(procedure))
    }

    /// Register a procedure as `namespace.name`
    pub fn register_in<P>(&mut self, namespace: &str, procedure: P) -> &mut Self
    where
        P: Procedure + 'static,
    {
        let name = qualified(Some(namespace), procedure.name());
        self.bind(name, Arc::new(procedure))
    }

    /// Register every procedure a collection exports, optionally namespaced
    pub fn register_collection<T>(&mut self, collection: Arc<T>, namespace: Option<&str>) -> &mut Self
    where
        T: ProcedureCollection,
    {
        for procedure in collection.procedures() {
            if procedure.name().starts_with('_') {
                debug!(procedure = procedure.name(), "Skipping private procedure");
                continue;
            }
            let name = qualified(namespace, procedure.name());
            self.bind(name, procedure);
        }
        self
    }

    fn bind(&mut self, name: String, procedure: Arc<dyn Procedure>) -> &mut Self {
        debug!(method = %name, "Registering procedure");
        if self.procedures.insert(name.clone(), procedure).is_some() {
            debug!(method = %name, "Replaced previously registered procedure");
        }
        self
    }

    /// Run one request/response cycle on a raw message.
    ///
    /// Returns the encoded reply, or `None` when nothing must be sent back
    /// (the message was a notification).
    pub fn dispatch(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let request = match self.serializer.decode_request(raw) {
            Ok(request) => request,
            Err(fault) => {
                // the id is unknown at this point, so the reply cannot be correlated
                debug!(code = fault.code, data = ?fault.data, "Rejected undecodable message");
                return Some(self.encode_fault(&fault, &RequestId::null()));
            }
        };

        let reply = self.handle_request(request)?;
        Some(self.encode_reply(&reply))
    }

    /// Invoke the procedure a decoded request names.
    ///
    /// Returns the reply to send, or `None` for notifications.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcMessage> {
        let notification = request.is_notification();
        let JsonRpcRequest { method, params, id } = request;

        let Some(procedure) = self.procedures.get(&method) else {
            debug!(method = %method, id = %id, "Method not found");
            return reply_unless(notification, || {
                JsonRpcMessage::error(Fault::method_not_found(None), id)
            });
        };

        let shape = procedure.accepts();
        if !shape.admits(&params) {
            debug!(method = %method, expected = ?shape, actual = ?params.shape(), "Rejected call shape");
            let detail = format!("{} expects {} params", method, shape_name(shape));
            return reply_unless(notification, || {
                JsonRpcMessage::error(Fault::invalid_method_params(Some(Value::String(detail))), id)
            });
        }

        match invoke(procedure.as_ref(), params) {
            Ok(result) => reply_unless(notification, || JsonRpcMessage::success(result, id)),
            Err(ProcedureError::Fault(fault)) => {
                debug!(method = %method, id = %id, code = fault.code, "Procedure raised fault");
                reply_unless(notification, || JsonRpcMessage::error(fault, id))
            }
            Err(ProcedureError::Failed(failure)) => {
                error!(
                    method = %method,
                    id = %id,
                    error = %failure,
                    details = ?failure,
                    "Procedure failed"
                );
                reply_unless(notification, || {
                    JsonRpcMessage::error(Fault::internal_error(None), id)
                })
            }
        }
    }

    fn encode_reply(&self, reply: &JsonRpcMessage) -> Vec<u8> {
        match self.serializer.encode_message(reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(id = %reply.id(), error = %e, "Failed to encode reply");
                self.encode_fault(&Fault::internal_error(None), reply.id())
            }
        }
    }

    fn encode_fault(&self, fault: &Fault, id: &RequestId) -> Vec<u8> {
        self.serializer.encode_error(fault, id).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode error reply, sending fallback");
            FALLBACK_INTERNAL_ERROR.to_vec()
        })
    }
}

fn reply_unless(
    notification: bool,
    reply: impl FnOnce() -> JsonRpcMessage,
) -> Option<JsonRpcMessage> {
    if notification { None } else { Some(reply()) }
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{}.{}", namespace, name),
        None => name.to_string(),
    }
}

fn shape_name(shape: ParamsShape) -> &'static str {
    match shape {
        ParamsShape::Positional => "positional",
        ParamsShape::Named => "named",
        ParamsShape::Any => "any",
    }
}

/// Call the procedure, turning a panic into an ordinary failure.
fn invoke(procedure: &dyn Procedure, params: Params) -> Result<Value, ProcedureError> {
    match panic::catch_unwind(AssertUnwindSafe(|| procedure.call(params))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(ProcedureError::failed(format!(
            "procedure panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, ErrorCode};
    use serde_json::json;
    use tracing_test::traced_test;

    fn echo() -> FunctionProcedure<impl Fn(Params) -> Result<Value, ProcedureError> + Send + Sync> {
        FunctionProcedure::new("echo", |params: Params| Ok(params.into_value()))
    }

    struct Api {
        greeting: String,
    }

    impl ProcedureCollection for Api {
        fn procedures(self: Arc<Self>) -> Vec<Arc<dyn Procedure>> {
            let api = Arc::clone(&self);
            vec![
                procedure("a", move |_params| Ok(json!(api.greeting))),
                procedure("b", |_params| Ok(json!("b"))),
                procedure("_hidden", |_params| Ok(Value::Null)),
            ]
        }
    }

    #[test]
    fn test_register_uses_procedure_name() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(echo());
        assert!(dispatcher.procedures().contains("echo"));
    }

    #[test]
    fn test_register_as_and_in() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register_as("repeat", echo()).register_in("util", echo());
        assert_eq!(dispatcher.procedures().names(), vec!["repeat", "util.echo"]);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::new("v", |_| Ok(json!(1))));
        dispatcher.register(FunctionProcedure::new("v", |_| Ok(json!(2))));

        let reply = dispatcher
            .handle_request(JsonRpcRequest::new_no_params("v", 1i64))
            .unwrap();
        assert_eq!(reply.into_result().unwrap(), json!(2));
        assert_eq!(dispatcher.procedures().len(), 1);
    }

    #[test]
    fn test_register_collection_namespaced() {
        let mut dispatcher = Dispatcher::new();
        let api = Arc::new(Api {
            greeting: "hello".to_string(),
        });
        dispatcher.register_collection(api, Some("ns"));
        assert_eq!(dispatcher.procedures().names(), vec!["ns.a", "ns.b"]);

        let reply = dispatcher
            .handle_request(JsonRpcRequest::new_no_params("ns.a", 1i64))
            .unwrap();
        assert_eq!(reply.into_result().unwrap(), json!("hello"));
    }

    #[test]
    fn test_register_collection_without_namespace() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register_collection(Arc::new(Api { greeting: String::new() }), None);
        assert_eq!(dispatcher.procedures().names(), vec!["a", "b"]);
    }

    #[test]
    fn test_method_not_found_keeps_id() {
        let dispatcher = Dispatcher::new();
        let reply = dispatcher
            .handle_request(JsonRpcRequest::new_no_params("missing", "r1"))
            .unwrap();
        assert_eq!(reply.id().as_str(), Some("r1"));
        assert_eq!(
            reply.into_result().unwrap_err().kind(),
            Some(ErrorCode::MethodNotFound)
        );
    }

    #[test]
    fn test_notifications_never_reply() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(echo())
            .register(FunctionProcedure::new("deny", |_| {
                Err(Fault::permission_denied(None).into())
            }))
            .register(FunctionProcedure::new("crash", |_| {
                Err(ProcedureError::failed("boom"))
            }));

        for method in ["echo", "deny", "crash", "missing"] {
            let notification = JsonRpcRequest::notification(method, Params::default());
            assert!(dispatcher.handle_request(notification).is_none(), "{method}");
        }
    }

    #[test]
    fn test_shape_mismatch_is_invalid_params() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::named("configure", |params: Params| {
            Ok(params.into_value())
        }));

        let reply = dispatcher
            .handle_request(JsonRpcRequest::new("configure", Params::from(vec![json!(1)]), 3i64))
            .unwrap();
        assert_eq!(reply.id(), &RequestId::from(3i64));
        let fault = reply.into_result().unwrap_err();
        assert_eq!(fault.kind(), Some(ErrorCode::InvalidMethodParams));
        assert_eq!(fault.data, Some(json!("configure expects named params")));
    }

    #[test]
    fn test_typed_params_fault_surfaces() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::positional("add", |params: Params| {
            let (a, b): (i64, i64) = params.parse()?;
            Ok(json!(a + b))
        }));

        let ok = dispatcher
            .handle_request(JsonRpcRequest::new("add", Params::from(vec![json!(7), json!(8)]), 1i64))
            .unwrap();
        assert_eq!(ok.into_result().unwrap(), json!(15));

        let bad = dispatcher
            .handle_request(JsonRpcRequest::new("add", Params::from(vec![json!("x")]), 1i64))
            .unwrap();
        assert_eq!(
            bad.into_result().unwrap_err().kind(),
            Some(ErrorCode::InvalidMethodParams)
        );
    }

    #[traced_test]
    #[test]
    fn test_internal_failure_is_logged_not_leaked() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::new("leaky", |_| {
            Err(anyhow::anyhow!("database password is hunter2").into())
        }));

        let reply = dispatcher
            .dispatch(br#"{"method": "leaky", "params": [], "id": 8}"#)
            .unwrap();
        let text = String::from_utf8(reply).unwrap();
        assert_eq!(
            text,
            r#"{"result": null, "error": {"code": -32603, "message": "Internal error."}, "id": 8}"#
        );
        assert!(!text.contains("hunter2"));
        assert!(logs_contain("database password is hunter2"));
    }

    #[traced_test]
    #[test]
    fn test_failed_notification_is_logged() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::new("leaky", |_| {
            Err(ProcedureError::failed("quietly broken"))
        }));

        assert!(dispatcher
            .dispatch(br#"{"method": "leaky", "params": [], "id": null}"#)
            .is_none());
        assert!(logs_contain("quietly broken"));
    }

    #[test]
    fn test_panicking_procedure_becomes_internal_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(FunctionProcedure::new("explode", |_| -> Result<Value, ProcedureError> {
            panic!("kaboom")
        }));

        let reply = dispatcher
            .handle_request(JsonRpcRequest::new_no_params("explode", 2i64))
            .unwrap();
        assert_eq!(reply.id(), &RequestId::from(2i64));
        assert_eq!(reply.into_result().unwrap_err(), Fault::internal_error(None));
    }

    #[test]
    fn test_table_debug_lists_names() {
        let mut table = ProcedureTable::new();
        assert!(table.is_empty());
        table.insert("b", procedure("b", |_| Ok(Value::Null)));
        table.insert("a", procedure("a", |_| Ok(Value::Null)));
        assert_eq!(format!("{:?}", table), r#"{"a", "b"}"#);
    }

    /// Refuses to encode any reply that carries a non-null result.
    struct NoResultsCodec;

    impl JsonCodec for NoResultsCodec {
        fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
            if value.get("result").is_some_and(|result| !result.is_null()) {
                return Err(CodecError("result not encodable".to_string()));
            }
            SerdeJsonCodec::default().encode(value)
        }

        fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
            SerdeJsonCodec::default().decode(bytes)
        }
    }

    struct MuteCodec;

    impl JsonCodec for MuteCodec {
        fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
            Err(CodecError("cannot encode".to_string()))
        }

        fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
            SerdeJsonCodec::default().decode(bytes)
        }
    }

    fn dispatcher_with<C: JsonCodec>(codec: C) -> Dispatcher<C> {
        let mut dispatcher = Dispatcher::with_serializer(Serializer::with_codec(codec, SerializerConfig::default()));
        dispatcher.register(FunctionProcedure::new("x", |_| Ok(json!(1))));
        dispatcher
    }

    #[traced_test]
    #[test]
    fn test_unencodable_result_becomes_internal_error() {
        let dispatcher = dispatcher_with(NoResultsCodec);

        let reply = dispatcher
            .dispatch(br#"{"method": "x", "params": [], "id": 5}"#)
            .unwrap();
        assert_eq!(
            reply,
            br#"{"result": null, "error": {"code": -32603, "message": "Internal error."}, "id": 5}"#
        );
        assert!(logs_contain("Failed to encode reply"));
        assert!(logs_contain("result not encodable"));
    }

    #[traced_test]
    #[test]
    fn test_unencodable_error_sends_fallback_literal() {
        let dispatcher = dispatcher_with(MuteCodec);

        let reply = dispatcher
            .dispatch(br#"{"method": "x", "params": [], "id": 5}"#)
            .unwrap();
        assert_eq!(reply, FALLBACK_INTERNAL_ERROR);
        assert!(logs_contain("sending fallback"));

        let reply = dispatcher.dispatch(b"not json").unwrap();
        assert_eq!(reply, FALLBACK_INTERNAL_ERROR);

        let decoded = Serializer::new().decode_reply(FALLBACK_INTERNAL_ERROR).unwrap();
        assert!(decoded.id().is_null());
        assert_eq!(decoded.into_result().unwrap_err(), Fault::internal_error(None));
    }
}
