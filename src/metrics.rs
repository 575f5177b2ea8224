//! Query and transaction instrumentation.
//!
//! With the `metrics` feature the crate records counters and a latency
//! histogram through the `opentelemetry` global meter; installing a meter
//! provider and exporter is left to the application. With the `tracing`
//! feature every statement and transaction step runs inside a span.

#[cfg(feature = "metrics")]
pub use self::otel::{TablekitMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<TablekitMetrics> = Lazy::new(TablekitMetrics::init);

    pub struct TablekitMetrics {
        pub queries_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub transactions_total: Counter<u64>,
    }

    impl TablekitMetrics {
        pub fn init() -> Self {
            let meter = global::meter("tablekit");

            let queries_total = meter
                .u64_counter("tablekit_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_duration = meter
                .f64_histogram("tablekit_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let transactions_total = meter
                .u64_counter("tablekit_transactions_total")
                .with_description("Transactions finished, by outcome")
                .build();

            Self {
                queries_total,
                query_duration,
                transactions_total,
            }
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_transaction(&self, outcome: &'static str) {
            self.transactions_total
                .add(1, &[KeyValue::new("outcome", outcome)]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::debug_span!("tablekit.execute", db.statement = sql)
    }

    pub fn begin_transaction_span(isolation: &str) -> Span {
        tracing::debug_span!("tablekit.transaction.begin", db.isolation = isolation)
    }

    pub fn commit_transaction_span() -> Span {
        tracing::debug_span!("tablekit.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        tracing::debug_span!("tablekit.transaction.rollback")
    }
}
