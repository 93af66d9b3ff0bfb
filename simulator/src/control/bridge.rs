use crate::control::model::{FrameSummary, StatusModel, TargetRequest};
use crate::generator::template::render_frame;
use crate::transport::AnyTransport;
use crate::workflow::zones::ZoneStore;
use anyhow::Context;
use log::{info, warn};
use poolwatchcore::interface::{DetectionFrame, ZoneConfig};
use poolwatchcore::tracking::{RescueTarget, ZoneSet};
use poolwatchcore::{DisplayId, WatchSession};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

pub type SharedSession = Arc<Mutex<WatchSession<AnyTransport>>>;

type Reply = WithStatus<Json>;

fn reply<T: Serialize>(body: &T, status: StatusCode) -> Reply {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn error_reply(status: StatusCode, message: &str) -> Reply {
    reply(&json!({ "error": message }), status)
}

/// HTTP surface for operators and external detectors.
#[derive(Clone)]
pub struct ControlBridge {
    session: SharedSession,
    state: Arc<RwLock<StatusModel>>,
    zones: Arc<RwLock<ZoneConfig>>,
    store: ZoneStore,
    frame_size: (usize, usize),
}

impl ControlBridge {
    pub fn new(
        session: SharedSession,
        store: ZoneStore,
        zones: ZoneConfig,
        frame_size: (usize, usize),
    ) -> Self {
        let state = StatusModel {
            status: "monitoring".to_string(),
            ..StatusModel::default()
        };
        Self {
            session,
            state: Arc::new(RwLock::new(state)),
            zones: Arc::new(RwLock::new(zones)),
            store,
            frame_size,
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, WatchSession<AnyTransport>>, Reply> {
        self.session
            .lock()
            .map_err(|_| error_reply(StatusCode::INTERNAL_SERVER_ERROR, "session lock poisoned"))
    }

    fn status(&self) -> Reply {
        let metrics = match self.lock_session() {
            Ok(session) => session.metrics(),
            Err(err) => return err,
        };
        match self.state.write() {
            Ok(mut state) => {
                state.metrics = metrics;
                reply(&*state, StatusCode::OK)
            }
            Err(_) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, "status lock poisoned"),
        }
    }

    fn ingest(&self, detections: DetectionFrame) -> Reply {
        let zones = match self.zones.read() {
            Ok(zones) => zones.clone(),
            Err(_) => {
                return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "zone lock poisoned")
            }
        };
        let (width, height) = self.frame_size;
        let frame = match render_frame(width, height, &zones, &detections) {
            Ok(frame) => Arc::new(frame),
            Err(err) => return error_reply(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        let report = {
            let mut session = match self.lock_session() {
                Ok(session) => session,
                Err(err) => return err,
            };
            match session.ingest(&detections, frame) {
                Ok(report) => report,
                Err(err) => {
                    warn!("ingest rejected: {}", err);
                    return error_reply(StatusCode::BAD_REQUEST, &err.to_string());
                }
            }
        };

        let summary = FrameSummary::from(&report);
        if let Ok(mut state) = self.state.write() {
            state.last_frame = Some(summary.clone());
        }
        reply(&summary, StatusCode::OK)
    }

    fn rescue(&self, request: TargetRequest) -> Reply {
        let target = match request.id {
            Some(id) => RescueTarget::One(DisplayId(id)),
            None => RescueTarget::All,
        };
        let rescued = match self.lock_session() {
            Ok(mut session) => session.rescue(target),
            Err(err) => return err,
        };
        reply(&json!({ "rescued": rescued }), StatusCode::OK)
    }

    fn acknowledge(&self, request: TargetRequest) -> Reply {
        let Some(id) = request.id else {
            return error_reply(StatusCode::BAD_REQUEST, "acknowledge needs an id");
        };
        let acknowledged = match self.lock_session() {
            Ok(mut session) => session.acknowledge(DisplayId(id)),
            Err(err) => return err,
        };
        reply(
            &json!({ "id": DisplayId(id), "acknowledged": acknowledged }),
            StatusCode::OK,
        )
    }

    fn reconfigure(&self, zones: ZoneConfig) -> Reply {
        let set = ZoneSet::from_config(&zones);
        let applied = set.to_config();
        if let Err(err) = self.store.save(&applied) {
            warn!("zones applied but not persisted: {:#}", err);
        }
        match self.lock_session() {
            Ok(mut session) => session.reconfigure_zones(set),
            Err(err) => return err,
        }
        if let Ok(mut current) = self.zones.write() {
            *current = applied.clone();
        }
        reply(&applied, StatusCode::OK)
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (Reply,), Error = warp::Rejection> + Clone + Send + Sync + 'static
    {
        let bridge = self.clone();
        let with_bridge = warp::any().map(move || bridge.clone());

        let status = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_bridge.clone())
            .map(|bridge: ControlBridge| bridge.status());

        let ingest = warp::path("ingest")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridge.clone())
            .map(|detections: DetectionFrame, bridge: ControlBridge| bridge.ingest(detections));

        let rescue = warp::path("rescue")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridge.clone())
            .map(|request: TargetRequest, bridge: ControlBridge| bridge.rescue(request));

        let acknowledge = warp::path("acknowledge")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridge.clone())
            .map(|request: TargetRequest, bridge: ControlBridge| bridge.acknowledge(request));

        let zones = warp::path("zones")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridge)
            .map(|zones: ZoneConfig, bridge: ControlBridge| bridge.reconfigure(zones));

        status
            .or(ingest)
            .unify()
            .or(rescue)
            .unify()
            .or(acknowledge)
            .unify()
            .or(zones)
            .unify()
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding control bridge to {}", addr))?;
        info!("control bridge listening on http://{}", bound);
        server.await;
        info!("control bridge stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{default_zones, ScenarioConfig};
    use crate::transport::console::ConsoleTransport;
    use poolwatchcore::interface::Detection;
    use poolwatchcore::{DispatchConfig, MonitorConfig, Point};
    use tokio::runtime::Handle;

    fn bridge(dir: &tempfile::TempDir) -> (ControlBridge, SharedSession) {
        let zones = default_zones(&ScenarioConfig::default());
        let dispatch = DispatchConfig {
            output_dir: dir.path().join("alerts"),
            send_video: false,
            ..DispatchConfig::default()
        };
        let session = WatchSession::new(
            MonitorConfig::default(),
            dispatch,
            ZoneSet::from_config(&zones),
            Arc::new(AnyTransport::Console(ConsoleTransport)),
            &Handle::current(),
        )
        .unwrap();
        let shared = Arc::new(Mutex::new(session));
        let store = ZoneStore::new(dir.path().join("zones.json"));
        (
            ControlBridge::new(Arc::clone(&shared), store, zones, (320, 180)),
            shared,
        )
    }

    fn frame(t: f64, people: &[(u64, f64, f64)]) -> DetectionFrame {
        DetectionFrame::new(
            t,
            people
                .iter()
                .map(|&(track, x, y)| Detection::person(track, Point::new(x, y), 0.9))
                .collect(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ingest_updates_status() {
        let dir = tempfile::tempdir().unwrap();
        let (bridge, _) = bridge(&dir);
        let routes = bridge.routes();

        let response = warp::test::request()
            .method("POST")
            .path("/ingest")
            .json(&frame(0.0, &[(1, 100.0, 90.0), (2, 280.0, 90.0)]))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&routes)
            .await;
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["last_frame"]["in_pool"], json!([1]));
        assert_eq!(body["last_frame"]["in_safe"], json!([2]));
        assert_eq!(body["metrics"]["frames_ingested"], json!(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rescue_and_acknowledge_flow() {
        let dir = tempfile::tempdir().unwrap();
        let (bridge, shared) = bridge(&dir);
        let routes = bridge.routes();
        for body in [frame(0.0, &[(1, 100.0, 90.0)]), frame(21.0, &[])] {
            warp::test::request()
                .method("POST")
                .path("/ingest")
                .json(&body)
                .reply(&routes)
                .await;
        }

        let response = warp::test::request()
            .method("POST")
            .path("/acknowledge")
            .json(&json!({}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = warp::test::request()
            .method("POST")
            .path("/rescue")
            .json(&json!({}))
            .reply(&routes)
            .await;
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["rescued"], json!([1]));
        assert!(shared
            .lock()
            .unwrap()
            .tracker()
            .monitor()
            .identity(DisplayId(1))
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zone_update_is_applied_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (bridge, shared) = bridge(&dir);
        let routes = bridge.routes();
        let update = ZoneConfig {
            pool_zone: Some(vec![[0.0, 0.0], [50.0, 0.0], [50.0, 50.0], [0.0, 50.0]]),
            safe_zone: Some(vec![[1.0, 1.0], [2.0, 2.0]]),
        };
        let response = warp::test::request()
            .method("POST")
            .path("/zones")
            .json(&update)
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let saved = ZoneStore::new(dir.path().join("zones.json")).load();
        assert_eq!(saved.pool_zone, update.pool_zone);
        assert!(saved.safe_zone.is_none());
        let session = shared.lock().unwrap();
        assert!(session.tracker().classifier().zones().safe.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_timestamp_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (bridge, _) = bridge(&dir);
        let response = warp::test::request()
            .method("POST")
            .path("/ingest")
            .body(r#"{"timestamp": "soon", "detections": []}"#)
            .reply(&bridge.routes())
            .await;
        assert!(response.status().is_client_error());
    }
}
