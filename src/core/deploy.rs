use crate::adapters::urllist_api::UrlListClient;
use crate::domain::model::DeployOutcome;
use crate::domain::ports::HttpTransport;

/// Commits pending list changes tenant-wide. A failure here never undoes the
/// sync; it only shows up in the outcome.
pub struct DeployTrigger<'c, 'a, T: HttpTransport + ?Sized> {
    client: &'c UrlListClient<'a, T>,
    enabled: bool,
}

impl<'c, 'a, T: HttpTransport + ?Sized> DeployTrigger<'c, 'a, T> {
    pub fn new(client: &'c UrlListClient<'a, T>, enabled: bool) -> Self {
        Self { client, enabled }
    }

    pub async fn run(&self) -> DeployOutcome {
        if !self.enabled {
            tracing::info!("Deploy not requested; changes stay pending on the tenant");
            return DeployOutcome::Skipped;
        }

        tracing::info!("🚀 Deploying URL list changes...");
        match self.client.deploy().await {
            Ok(()) => {
                tracing::info!("✅ Deploy accepted");
                DeployOutcome::Deployed
            }
            Err(error) => {
                tracing::error!("❌ Deploy failed: {}", error);
                DeployOutcome::Failed(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::ScriptedTransport;
    use crate::domain::ports::HttpMethod;

    #[tokio::test]
    async fn test_disabled_deploy_makes_no_call() {
        let transport = ScriptedTransport::new();
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let outcome = DeployTrigger::new(&client, false).run().await;

        assert_eq!(outcome, DeployOutcome::Skipped);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_deploy_success() {
        let transport = ScriptedTransport::new().respond(200, r#"{"status": "success"}"#);
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let outcome = DeployTrigger::new(&client, true).run().await;

        assert_eq!(outcome, DeployOutcome::Deployed);
        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert!(requests[0].url.ends_with("/api/v2/policy/urllist/deploy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_retries_then_reports_failure() {
        let transport = ScriptedTransport::new().respond_times(4, 502, "bad gateway");
        let client = UrlListClient::new(&transport, "acme.goskope.com", "tok");

        let outcome = DeployTrigger::new(&client, true).run().await;

        assert!(matches!(outcome, DeployOutcome::Failed(ref reason) if reason.contains("HTTP 502")));
        assert_eq!(transport.calls(), 4);
    }
}
