//! The tiny_http serving loop.
use crate::{
    actions::ActionTable,
    api::{
        observation_vector, ActionRequest, ActionResponse, ErrorResponse, TrainResponse,
        UnpauseResponse,
    },
    config::ServerConfig,
    learner::AnyLearner,
};
use anyhow::{anyhow, Result};
use huddle_core::{error::HuddleError, TrainingCoordinator};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server};

struct Service {
    observation_keys: Vec<String>,
    actions: ActionTable,
    coordinator: Arc<TrainingCoordinator<AnyLearner>>,
}

/// Serves the agent-facing API until the process exits.
///
/// tiny_http's accept queue is shared by a small pool of worker threads;
/// each worker blocks in `recv()` and handles one request at a time, so
/// requests from different agents run concurrently against the
/// coordinator.
pub fn serve(config: &ServerConfig, coordinator: Arc<TrainingCoordinator<AnyLearner>>) -> Result<()> {
    let server =
        Server::http(&config.bind_addr).map_err(|e| anyhow!("binding {}: {}", config.bind_addr, e))?;
    let server = Arc::new(server);
    let service = Arc::new(Service {
        observation_keys: config.observation_keys.clone(),
        actions: config.actions.clone(),
        coordinator,
    });
    info!("listening on {}", config.bind_addr);

    let mut workers = Vec::new();
    for _ in 0..config.workers.max(1) {
        let server = server.clone();
        let service = service.clone();
        workers.push(std::thread::spawn(move || loop {
            match server.recv() {
                Ok(request) => service.handle(request),
                Err(e) => warn!("receiving request: {}", e),
            }
        }));
    }
    for worker in workers {
        let _ = worker.join();
    }

    Ok(())
}

impl Service {
    fn handle(&self, mut request: Request) {
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or("");
        let method = request.method().clone();
        let (status, body) = match (method, path) {
            (Method::Post, "/get_action") => self.get_action(&mut request),
            (Method::Get, "/check_unpause") => self.check_unpause(&url),
            (Method::Post, "/train") => self.train(),
            _ => error_body(404, "not found".to_string()),
        };
        respond(request, status, body);
    }

    fn get_action(&self, request: &mut Request) -> (u16, String) {
        let body: ActionRequest = match serde_json::from_reader(request.as_reader()) {
            Ok(body) => body,
            Err(e) => return error_body(400, format!("malformed request: {}", e)),
        };
        let obs = match observation_vector(&self.observation_keys, &body.observation) {
            Ok(obs) => obs,
            Err(e) => return error_of(&e),
        };
        match self
            .coordinator
            .step(&body.agent_id, obs, body.done, body.win)
        {
            Ok(outcome) => json_body(
                200,
                &ActionResponse {
                    action: self.actions.response(outcome.act),
                    pause: outcome.pause,
                },
            ),
            Err(e) => error_of(&e),
        }
    }

    fn check_unpause(&self, url: &str) -> (u16, String) {
        let agent_id = match query_param(url, "agent_id") {
            Some(agent_id) => agent_id,
            None => return error_body(400, "missing agent_id".to_string()),
        };
        let unpause = self.coordinator.check_unpause(&agent_id);
        json_body(200, &UnpauseResponse { unpause })
    }

    fn train(&self) -> (u16, String) {
        match self.coordinator.trigger_training() {
            Ok(()) => json_body(200, &TrainResponse::completed()),
            Err(e) => error_of(&e),
        }
    }
}

fn status_of(err: &HuddleError) -> u16 {
    match err {
        HuddleError::ObservationLength { .. }
        | HuddleError::MissingObservation(_)
        | HuddleError::ObservationNotFinite(_) => 400,
        HuddleError::TrainingInProgress | HuddleError::NotReadyToTrain => 503,
        HuddleError::ActionSpaceMismatch { .. } | HuddleError::Learner(_) => 500,
    }
}

fn error_of(err: &HuddleError) -> (u16, String) {
    error_body(status_of(err), err.to_string())
}

fn error_body(status: u16, error: String) -> (u16, String) {
    json_body(status, &ErrorResponse { error })
}

fn json_body<T: Serialize>(status: u16, value: &T) -> (u16, String) {
    match serde_json::to_string(value) {
        Ok(body) => (status, body),
        Err(e) => (
            500,
            format!("{{\"error\":\"serializing response: {}\"}}", e),
        ),
    }
}

fn respond(request: Request, status: u16, body: String) {
    let response = Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
        )
        .with_header(
            Header::from_bytes(&b"Access-Control-Allow-Origin"[..], &b"*"[..]).unwrap(),
        );
    let _ = request.respond(response);
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split('?').nth(1)?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key && !v.is_empty() {
            Some(v.to_string())
        } else {
            None
        }
    })
}
