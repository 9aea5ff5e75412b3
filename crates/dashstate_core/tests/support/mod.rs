#![allow(dead_code)]

use async_trait::async_trait;
use dashstate_core::{
    AuthSyncConfig, AuthSynchronizer, AuthTransport, AuthTransportError, RedirectQueue,
    ResponseOrdering, StatusResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted status response.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub result: Result<StatusResponse, AuthTransportError>,
}

impl Step {
    pub fn ok(response: StatusResponse) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(response),
        }
    }

    pub fn err(error: AuthTransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport replaying scripted steps, then repeating a fallback.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    logout_result: Result<(), AuthTransportError>,
    status_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn always(step: Step) -> Arc<Self> {
        Self::scripted(Vec::new(), step)
    }

    pub fn scripted(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            fallback,
            logout_result: Ok(()),
            status_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_logout(step: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: step,
            logout_result: Err(AuthTransportError::Unavailable(502)),
            status_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        })
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthTransport for ScriptedTransport {
    async fn fetch_status(&self) -> Result<StatusResponse, AuthTransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }

    async fn logout(&self) -> Result<(), AuthTransportError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_result.clone()
    }
}

pub fn config(ordering: ResponseOrdering) -> AuthSyncConfig {
    let mut config = AuthSyncConfig::new("http://dashboard.test");
    config.ordering = ordering;
    config
}

pub fn synchronizer(
    config: &AuthSyncConfig,
    transport: Arc<ScriptedTransport>,
    route: &str,
) -> (Arc<AuthSynchronizer>, Arc<RedirectQueue>) {
    let navigator = Arc::new(RedirectQueue::new(route));
    let synchronizer = Arc::new(AuthSynchronizer::new(
        config,
        transport,
        navigator.clone(),
    ));
    (synchronizer, navigator)
}
