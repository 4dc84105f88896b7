//! Health status reporting

pub mod elastic_alerter;

pub use elastic_alerter::{
    health_document_id, AlertPlan, ElasticHealthAlerter, HealthAlertError, HealthCheckDocument,
};
