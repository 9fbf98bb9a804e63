use serde::Serialize;

use rho_ai::build_generator_client;

use crate::context::ServiceContext;
use crate::orchestrator::tracker_client;

/// Status of one collaborator service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn of(status: &str) -> Self {
        Self {
            status: status.to_string(),
            message: None,
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
        }
    }
}

/// Aggregate health of the service's collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub tracker: ServiceHealth,
    pub generator: ServiceHealth,
}

/// Probes the tracker with a cheap read and checks that a generator
/// backend can be constructed from the current configuration. The
/// generator is never actually invoked here.
pub async fn service_health(ctx: &ServiceContext) -> HealthReport {
    let config = match ctx.resolver().get() {
        Ok(config) => config,
        Err(error) => {
            return HealthReport {
                status: "warning".to_string(),
                tracker: ServiceHealth {
                    status: "not_configured".to_string(),
                    message: Some(error.to_string()),
                },
                generator: ServiceHealth::of("not_configured"),
            }
        }
    };

    let tracker = match tracker_client(config.as_ref()) {
        Ok(client) => match client.probe().await {
            Ok(()) => ServiceHealth::of("healthy"),
            Err(error) => ServiceHealth::unhealthy(error.to_string()),
        },
        Err(error) => ServiceHealth::unhealthy(error.to_string()),
    };

    let generator = match build_generator_client(config.as_ref(), ctx.mock_generator()) {
        Ok(_) => ServiceHealth::of("configured"),
        Err(error) => ServiceHealth::unhealthy(error.to_string()),
    };

    let status = if tracker.status != "healthy" {
        "unhealthy"
    } else if generator.status != "configured" {
        "warning"
    } else {
        "healthy"
    };

    HealthReport {
        status: status.to_string(),
        tracker,
        generator,
    }
}
