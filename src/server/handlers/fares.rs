use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Json};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fare::{Estimator, FareEstimate, PricingConfig};
use crate::server::DynAPI;

#[derive(Debug, Serialize, Deserialize)]
pub struct EstimateParams {
    pickup: String,
    destination: String,
}

/// Messages accepted on the live estimation socket.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveCommand {
    Inputs { pickup: String, destination: String },
    Recalculate,
}

#[axum_macros::debug_handler]
pub async fn estimate(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<EstimateParams>,
) -> Result<Json<FareEstimate>, Error> {
    let estimate = api.estimate_fare(params.pickup, params.destination).await?;

    Ok(estimate.into())
}

pub async fn config(Extension(api): Extension<DynAPI>) -> Json<PricingConfig> {
    api.pricing_config().into()
}

pub async fn live(ws: WebSocketUpgrade, Extension(api): Extension<DynAPI>) -> Response {
    let estimator = api.estimator();

    ws.on_upgrade(move |socket| run_live(socket, estimator))
}

async fn run_live(socket: WebSocket, estimator: Estimator) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = estimator.subscribe();

    let forward = tokio::spawn(async move {
        loop {
            let text = {
                let state = updates.borrow_and_update();
                serde_json::to_string(&*state)
            };

            let text = match text {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!("failed to encode estimation state: {}", err);
                    break;
                }
            };

            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }

            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<LiveCommand>(&text) {
                Ok(LiveCommand::Inputs {
                    pickup,
                    destination,
                }) => estimator.set_inputs(pickup, destination),
                Ok(LiveCommand::Recalculate) => estimator.recalculate(),
                Err(err) => tracing::debug!("ignoring malformed live command: {}", err),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!("live socket closed: {}", err);
                break;
            }
        }
    }

    forward.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_commands_are_tagged_by_type() {
        let inputs: LiveCommand = serde_json::from_str(
            r#"{"type":"inputs","pickup":"Park Street","destination":"Howrah Station"}"#,
        )
        .unwrap();
        assert_eq!(
            inputs,
            LiveCommand::Inputs {
                pickup: "Park Street".into(),
                destination: "Howrah Station".into(),
            }
        );

        let recalculate: LiveCommand = serde_json::from_str(r#"{"type":"recalculate"}"#).unwrap();
        assert_eq!(recalculate, LiveCommand::Recalculate);

        assert!(serde_json::from_str::<LiveCommand>(r#"{"type":"teleport"}"#).is_err());
    }
}
