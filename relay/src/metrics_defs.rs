use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "requests",
    metric_type: MetricType::Counter,
    description: "Number of handled requests. Tagged with method, outcome.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with outcome.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const RELAY_DURATION: MetricDef = MetricDef {
    name: "relay.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent waiting on the upstream in seconds. Tagged with outcome.",
};

pub const LINES_ENCODED: MetricDef = MetricDef {
    name: "lines.encoded",
    metric_type: MetricType::Counter,
    description: "Number of measurement lines built from submissions. Tagged with measurement.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    RELAY_DURATION,
    LINES_ENCODED,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique() {
        let names: HashSet<_> = ALL_METRICS.iter().map(|def| def.name).collect();
        assert_eq!(names.len(), ALL_METRICS.len());
    }
}
