use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::{Duration, interval};


// Single Ollama server

pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

// Round-robin over one or more backends

pub struct LoadBalancer {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl LoadBalancer {
    // From comma-separated hosts, e.g. "localhost:11434, http://gpu-box:11434"
    pub fn new(backends_str: &str) -> anyhow::Result<Self> {
        let backends: Vec<Arc<Backend>> = backends_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|url| {
                let full_url = if url.starts_with("http://") || url.starts_with("https://") {
                    url.trim_end_matches('/').to_string()
                } else {
                    format!("http://{}", url.trim_end_matches('/'))
                };
                Arc::new(Backend::new(full_url))
            })
            .collect();

        if backends.is_empty() {
            anyhow::bail!("at least one backend required");
        }

        tracing::info!("load balancer initialized with {} backend(s)", backends.len());
        for (i, b) in backends.iter().enumerate() {
            tracing::info!("  [{}] {}", i + 1, b.url);
        }

        Ok(Self {
            backends,
            current: AtomicUsize::new(0),
        })
    }

    // Next healthy backend; when every flag is down the rotation continues
    // anyway, so a recovered server is reached before the next health tick
    pub fn get_backend(&self) -> Arc<Backend> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        let next = (0..len)
            .map(|i| &self.backends[(start + i) % len])
            .find(|b| b.is_healthy())
            .unwrap_or(&self.backends[start]);
        Arc::clone(next)
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

// Probes every backend's /api/tags on a fixed interval

pub async fn health_checker(
    load_balancer: Arc<LoadBalancer>,
    client: reqwest::Client,
    check_interval: Duration,
) {
    let mut interval = interval(check_interval);

    tracing::info!("health checker started (interval: {:?})", check_interval);

    loop {
        interval.tick().await;

        for backend in load_balancer.all_backends() {
            let url = format!("{}/api/tags", backend.url);

            let was_healthy = backend.is_healthy();

            let is_healthy = match client.get(&url).timeout(Duration::from_secs(5)).send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            backend.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    tracing::info!("backend {} is now healthy", backend.url);
                } else {
                    tracing::warn!("backend {} is now unhealthy", backend.url);
                }
            }
        }
    }
}
