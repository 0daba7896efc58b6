use crate::bridge::model::{RequestUpdate, StatusModel};
use crate::workflow::runner::RunSummary;
use anyhow::Context;
use log::{error, info};
use serde_json::json;
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{mpsc, Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

type SharedModel = Arc<RwLock<StatusModel>>;

pub fn bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn read_model(state: &SharedModel) -> StatusModel {
    match state.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_model(state: &SharedModel, model: StatusModel) {
    match state.write() {
        Ok(mut guard) => *guard = model,
        Err(poisoned) => *poisoned.into_inner() = model,
    }
}

/// `GET /summary`, `GET /records` and `POST /request`.
pub fn routes(
    state: SharedModel,
    request_file: PathBuf,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let summary_route = warp::path("summary")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: SharedModel| warp::reply::json(&read_model(&state)));

    let records_route = warp::path("records")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedModel| warp::reply::json(&read_model(&state).summary.records));

    let request_route = warp::path("request")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .map(move |update: RequestUpdate| {
            let source = update.into_source();
            match source.write_request_file(&request_file) {
                Ok(()) => {
                    info!("bridge stored request '{source}'");
                    warp::reply::with_status(
                        warp::reply::json(&json!({"status": "ok", "request": source.to_string()})),
                        StatusCode::OK,
                    )
                }
                Err(err) => {
                    error!("bridge failed to store request: {err}");
                    warp::reply::with_status(
                        warp::reply::json(&json!({"status": "error", "message": err.to_string()})),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                }
            }
        });

    summary_route.or(records_route).or(request_route)
}

/// HTTP endpoint exposing the last run and accepting the next request.
pub struct StatusBridge {
    state: SharedModel,
    address: SocketAddr,
}

impl StatusBridge {
    /// Binds on a background thread and returns once the socket is bound.
    pub fn start(address: SocketAddr, request_file: PathBuf) -> anyhow::Result<Self> {
        let state = Arc::new(RwLock::new(StatusModel::default()));
        let filter = routes(state.clone(), request_file);
        let (bound_tx, bound_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = bound_tx.send(Err(anyhow::Error::from(err).context("creating bridge runtime")));
                    return;
                }
            };
            runtime.block_on(async move {
                match warp::serve(filter).try_bind_ephemeral(address) {
                    Ok((bound, server)) => {
                        let _ = bound_tx.send(Ok(bound));
                        server.await;
                    }
                    Err(err) => {
                        let _ = bound_tx.send(Err(anyhow::Error::from(err).context("binding status bridge")));
                    }
                }
            });
        });

        let address = bound_rx
            .recv()
            .context("status bridge thread exited before binding")??;
        Ok(Self { state, address })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn publish(&self, summary: &RunSummary) {
        write_model(&self.state, StatusModel::from_summary(summary.clone()));
        println!(
            "[bridge] frame status: {}, records: {}",
            summary.frame_status,
            summary.records.len()
        );
    }

    pub fn publish_status(&self, message: &str) {
        let mut model = read_model(&self.state);
        model.status = message.to_string();
        write_model(&self.state, model);
        println!("[bridge] {message}");
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> StatusModel {
        read_model(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsortcore::catalog::RequestedSource;
    use std::fs;
    use tempfile::tempdir;

    fn summary() -> RunSummary {
        RunSummary {
            frame_status: "Frame1 only".into(),
            request: "CIRCUIT1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn bridge_publishes_latest_summary() {
        let dir = tempdir().unwrap();
        let bridge = StatusBridge::start(bind_address(0), dir.path().join("request.txt")).unwrap();
        assert_ne!(bridge.address().port(), 0);

        bridge.publish(&summary());
        bridge.publish_status("waiting for next batch");
        let model = bridge.snapshot();
        assert_eq!(model.summary.frame_status, "Frame1 only");
        assert_eq!(model.status, "waiting for next batch");
    }

    #[tokio::test]
    async fn summary_route_serves_model() {
        let dir = tempdir().unwrap();
        let state = Arc::new(RwLock::new(StatusModel::from_summary(summary())));
        let filter = routes(state, dir.path().join("request.txt"));

        let response = warp::test::request().method("GET").path("/summary").reply(&filter).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["summary"]["request"], "CIRCUIT1");

        let response = warp::test::request().method("GET").path("/records").reply(&filter).await;
        assert_eq!(response.body().as_ref(), b"[]");
    }

    #[tokio::test]
    async fn request_route_writes_request_file() {
        let dir = tempdir().unwrap();
        let request_file = dir.path().join("request.txt");
        let filter = routes(Arc::new(RwLock::new(StatusModel::default())), request_file.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/request")
            .json(&json!({"parts": "LM745, SN7414N"}))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            fs::read_to_string(&request_file).unwrap(),
            "Requested Part: LM745, SN7414N"
        );
        assert_eq!(
            RequestedSource::read_request_file(&request_file).unwrap(),
            RequestedSource::parts_from_list("LM745, SN7414N")
        );
    }
}
