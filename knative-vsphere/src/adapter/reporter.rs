use tracing::info;

/// The resource group events are reported under.
pub const RESOURCE_GROUP: &str = "vspheresources.sources.tanzu.vmware.com";

/// Dimensions of a delivery count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArgs {
    pub namespace: String,
    pub event_source: String,
    pub event_type: String,
    pub resource_group: String,
}

/// Counts delivery attempts by response code.
pub trait StatsReporter: Send + Sync {
    fn report_event_count(&self, args: &ReportArgs, response_code: u16);
}

/// Reports through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatsReporter for TracingReporter {
    fn report_event_count(&self, args: &ReportArgs, response_code: u16) {
        info!(
            namespace = %args.namespace,
            event_source = %args.event_source,
            event_type = %args.event_type,
            resource_group = %args.resource_group,
            response_code,
            "event count"
        );
    }
}
