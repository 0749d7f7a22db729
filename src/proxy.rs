// Copyright (c) 2025 - Cowboy AI, Inc.

//! Proxy Reconciler - ensure a vhost block exists and is live
//!
//! The shared proxy config file is append-only from this service's point of
//! view. The existence check is plain substring containment of the dotted
//! hostname in the file text; the file is never parsed. A hostname that is a
//! textual substring of an already configured one (`a.b.com` inside
//! `xa.b.com`) is therefore reported as configured. This is a known
//! limitation of the gate.
//!
//! The whole read-check-append-reload sequence runs under one async mutex so
//! concurrent activations cannot interleave appends.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::Hostname;
use crate::errors::{ProxyError, ProxyResult};

/// Reloads the running proxy against a config file
#[async_trait]
pub trait ProxyReloader: Send + Sync {
    async fn reload(&self, config_path: &Path) -> ProxyResult<()>;
}

/// Outcome of [`ProxyReconciler::ensure_route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Hostname already present in the config text, nothing done
    AlreadyConfigured,
    /// Block appended and proxy reloaded
    Added,
}

/// Ensures a static-file vhost exists for a hostname
pub struct ProxyReconciler {
    config_path: PathBuf,
    websites_root: PathBuf,
    reloader: Box<dyn ProxyReloader>,
    lock: Mutex<()>,
}

impl ProxyReconciler {
    pub fn new(
        config_path: impl Into<PathBuf>,
        websites_root: impl Into<PathBuf>,
        reloader: Box<dyn ProxyReloader>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            websites_root: websites_root.into(),
            reloader,
            lock: Mutex::new(()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The vhost block for `hostname`, followed by a blank line
    pub fn vhost_block(&self, hostname: &Hostname) -> String {
        format!(
            "{} {{\n\troot * {}\n\tfile_server\n}}\n\n",
            hostname.dotted(),
            self.websites_root.join(hostname.dir_name()).display()
        )
    }

    pub async fn ensure_route(&self, hostname: &Hostname) -> ProxyResult<RouteOutcome> {
        let _guard = self.lock.lock().await;
        let full_hostname = hostname.dotted();

        info!("Adding domain {} to proxy config...", full_hostname);
        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|source| self.config_error(source))?;

        if content.contains(&full_hostname) {
            info!("Domain {} already exists in proxy config", full_hostname);
            return Ok(RouteOutcome::AlreadyConfigured);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.config_path)
            .await
            .map_err(|source| self.config_error(source))?;
        file.write_all(self.vhost_block(hostname).as_bytes())
            .await
            .map_err(|source| self.config_error(source))?;
        file.flush().await.map_err(|source| self.config_error(source))?;
        drop(file);

        self.reloader.reload(&self.config_path).await?;
        info!("Proxy reloaded with route for {}", full_hostname);

        Ok(RouteOutcome::Added)
    }

    fn config_error(&self, source: std::io::Error) -> ProxyError {
        ProxyError::Config {
            path: self.config_path.clone(),
            source,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reloader counting invocations
    #[derive(Clone, Default)]
    pub(crate) struct CountingReloader {
        pub count: Arc<AtomicUsize>,
        pub fail: bool,
    }

    #[async_trait]
    impl ProxyReloader for CountingReloader {
        async fn reload(&self, _config_path: &Path) -> ProxyResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProxyError::Reload("exit status: 1".into()))
            } else {
                Ok(())
            }
        }
    }

    fn setup(initial: &str) -> (tempfile::TempDir, ProxyReconciler, CountingReloader) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("Caddyfile");
        std::fs::write(&config, initial).unwrap();
        let reloader = CountingReloader::default();
        let proxy = ProxyReconciler::new(&config, "/srv/sites", Box::new(reloader.clone()));
        (dir, proxy, reloader)
    }

    #[tokio::test]
    async fn test_appends_block_once() {
        let (_dir, proxy, reloader) = setup("");
        let host = Hostname::new(["abc", "example", "com"]).unwrap();

        assert_eq!(proxy.ensure_route(&host).await.unwrap(), RouteOutcome::Added);
        assert_eq!(
            proxy.ensure_route(&host).await.unwrap(),
            RouteOutcome::AlreadyConfigured
        );

        let content = std::fs::read_to_string(proxy.config_path()).unwrap();
        assert_eq!(
            content,
            "abc.example.com {\n\troot * /srv/sites/abc_example_com\n\tfile_server\n}\n\n"
        );
        assert_eq!(reloader.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_entries_are_preserved() {
        let existing = "other.example.com {\n\treverse_proxy localhost:8080\n}\n";
        let (_dir, proxy, _reloader) = setup(existing);
        let host = Hostname::new(["abc", "example", "com"]).unwrap();

        proxy.ensure_route(&host).await.unwrap();

        let content = std::fs::read_to_string(proxy.config_path()).unwrap();
        assert!(content.starts_with(existing));
        assert_eq!(content.matches("abc.example.com {").count(), 1);
    }

    #[tokio::test]
    async fn test_substring_hostname_counts_as_configured() {
        let (_dir, proxy, reloader) = setup("xa.b.com {\n\tfile_server\n}\n");
        let host = Hostname::new(["a", "b", "com"]).unwrap();

        assert_eq!(
            proxy.ensure_route(&host).await.unwrap(),
            RouteOutcome::AlreadyConfigured
        );
        assert_eq!(reloader.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let reloader = CountingReloader::default();
        let proxy = ProxyReconciler::new(
            "/nonexistent/lizcel/Caddyfile",
            "/srv/sites",
            Box::new(reloader.clone()),
        );
        let err = proxy
            .ensure_route(&Hostname::new(["example", "com"]).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Config { .. }));
        assert_eq!(reloader.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reload_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("Caddyfile");
        std::fs::write(&config, "").unwrap();
        let reloader = CountingReloader {
            fail: true,
            ..Default::default()
        };
        let proxy = ProxyReconciler::new(&config, "/srv/sites", Box::new(reloader));

        let err = proxy
            .ensure_route(&Hostname::new(["example", "com"]).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Reload(_)));
    }

    #[tokio::test]
    async fn test_concurrent_activations_append_each_block_once() {
        let (_dir, proxy, reloader) = setup("");
        let proxy = Arc::new(proxy);

        let mut handles = Vec::new();
        for i in 0..8 {
            let proxy = proxy.clone();
            handles.push(tokio::spawn(async move {
                let host = Hostname::new([format!("site{}", i % 4), "example".into(), "com".into()])
                    .unwrap();
                proxy.ensure_route(&host).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(proxy.config_path()).unwrap();
        for i in 0..4 {
            assert_eq!(content.matches(&format!("site{}.example.com {{", i)).count(), 1);
        }
        assert_eq!(reloader.count.load(Ordering::SeqCst), 4);
    }
}
