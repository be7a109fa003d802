use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, register_counter, register_counter_vec, register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "archivist_requests_total",
        "Total number of requests",
        &["endpoint"]
    )
    .unwrap();
    pub static ref GENERATION_LATENCY: Histogram = register_histogram!(
        "archivist_generation_latency_seconds",
        "Time spent waiting on the model for a full completion"
    )
    .unwrap();
    pub static ref FILES_SAVED: Counter =
        register_counter!("archivist_files_saved_total", "Responses written to disk").unwrap();
    pub static ref SAVE_FAILURES: Counter =
        register_counter!("archivist_save_failures_total", "Responses that could not be saved").unwrap();
    pub static ref PROVIDER_ERRORS: Counter =
        register_counter!("archivist_provider_errors_total", "Failed calls to the model backend").unwrap();
}
