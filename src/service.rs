use crate::{
    annotation::{AnnotationOutcome, Annotator},
    error::{AnnotationError, ServiceError},
    host::{Host, PathPolicy},
    templating::Template,
};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::{debug, error, info};

pub const DOMAIN: &str = "image_annotation";
pub const ACTION: &str = "annotate";

pub const ATTR_FILENAME: &str = "filename";
pub const ATTR_ANNOTATION: &str = "annotation";

/// Validated call data: every field is a template.
pub type ServiceData = BTreeMap<String, Template>;

#[derive(Debug, Clone)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: ServiceData,
}

pub trait ServiceHandler: Send + Sync {
    fn handle(&self, call: &ServiceCall) -> Result<(), AnnotationError>;
}

/// Fields a service accepts. Every listed field must be present; anything
/// not listed is rejected.
#[derive(Debug, Clone, Default)]
pub struct ServiceSchema {
    required: Vec<&'static str>,
}

impl ServiceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &'static str) -> Self {
        self.required.push(field);
        self
    }

    pub fn validate(&self, data: &Value) -> Result<ServiceData, ServiceError> {
        let empty = serde_json::Map::new();
        let object = match data {
            Value::Object(object) => object,
            Value::Null => &empty,
            other => {
                return Err(ServiceError::InvalidData(format!(
                    "expected a dictionary, got {}",
                    other
                )));
            }
        };

        for key in object.keys() {
            if !self.required.contains(&key.as_str()) {
                return Err(ServiceError::InvalidData(format!(
                    "extra keys not allowed @ data['{}']",
                    key
                )));
            }
        }

        let mut validated = ServiceData::new();
        for field in &self.required {
            let Some(value) = object.get(*field) else {
                return Err(ServiceError::InvalidData(format!(
                    "required key not provided @ data['{}']",
                    field
                )));
            };
            validated.insert(field.to_string(), template_value(field, value)?);
        }

        Ok(validated)
    }
}

/// Scalars become templates; null and containers are rejected.
fn template_value(field: &str, value: &Value) -> Result<Template, ServiceError> {
    match value {
        Value::String(s) => Ok(Template::new(s.clone())),
        Value::Number(n) => Ok(Template::new(n.to_string())),
        Value::Bool(b) => Ok(Template::new(if *b { "True" } else { "False" })),
        Value::Null => Err(ServiceError::InvalidData(format!(
            "template value is None for dictionary value @ data['{}']",
            field
        ))),
        Value::Array(_) | Value::Object(_) => Err(ServiceError::InvalidData(format!(
            "template value should be a string for dictionary value @ data['{}']",
            field
        ))),
    }
}

struct RegisteredService {
    schema: ServiceSchema,
    handler: Arc<dyn ServiceHandler>,
}

/// Services a host exposes, keyed by domain and service name.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<(String, String), RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        domain: &str,
        service: &str,
        schema: ServiceSchema,
        handler: Arc<dyn ServiceHandler>,
    ) {
        info!("Registering service {}.{}", domain, service);
        self.services.insert(
            (domain.to_string(), service.to_string()),
            RegisteredService { schema, handler },
        );
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services
            .contains_key(&(domain.to_string(), service.to_string()))
    }

    pub fn call(&self, domain: &str, service: &str, data: Value) -> Result<(), ServiceError> {
        let registered = self
            .services
            .get(&(domain.to_string(), service.to_string()))
            .ok_or_else(|| ServiceError::NotFound {
                domain: domain.to_string(),
                service: service.to_string(),
            })?;

        let data = registered.schema.validate(&data)?;
        let call = ServiceCall {
            domain: domain.to_string(),
            service: service.to_string(),
            data,
        };

        registered.handler.handle(&call).map_err(|e| {
            error!("Error executing service {}.{}: {}", domain, service, e);
            ServiceError::Handler(e)
        })
    }
}

/// The fields of one `image_annotation.annotate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRequest {
    pub filename: Template,
    pub annotation: Option<Template>,
}

impl AnnotationRequest {
    pub fn from_call(call: &ServiceCall) -> Result<Self, AnnotationError> {
        let filename = call
            .data
            .get(ATTR_FILENAME)
            .cloned()
            .ok_or(AnnotationError::MissingField(ATTR_FILENAME))?;
        let annotation = call.data.get(ATTR_ANNOTATION).cloned();

        Ok(Self {
            filename,
            annotation,
        })
    }
}

pub struct AnnotateHandler {
    annotator: Annotator,
    policy: Arc<dyn PathPolicy>,
}

impl AnnotateHandler {
    pub fn new(annotator: Annotator, policy: Arc<dyn PathPolicy>) -> Self {
        Self { annotator, policy }
    }

    pub fn annotate(
        &self,
        request: &AnnotationRequest,
    ) -> Result<AnnotationOutcome, AnnotationError> {
        self.annotator.annotate(
            &request.filename,
            request.annotation.as_ref(),
            self.policy.as_ref(),
        )
    }
}

impl ServiceHandler for AnnotateHandler {
    fn handle(&self, call: &ServiceCall) -> Result<(), AnnotationError> {
        debug!("Calling annotation");
        let request = AnnotationRequest::from_call(call)?;
        self.annotate(&request).map(|_| ())
    }
}

pub fn annotate_schema() -> ServiceSchema {
    ServiceSchema::new()
        .required(ATTR_FILENAME)
        .required(ATTR_ANNOTATION)
}

/// Registers `image_annotation.annotate` with the host.
pub fn setup(registry: &mut ServiceRegistry, host: &Host) -> bool {
    let annotator = Annotator::new(host.resolver.clone(), host.context.clone());
    let handler = AnnotateHandler::new(annotator, host.policy.clone());

    registry.register(DOMAIN, ACTION, annotate_schema(), Arc::new(handler));
    true
}
