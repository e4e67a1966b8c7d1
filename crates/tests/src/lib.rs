//! Fixtures shared by the integration tests: raw source files on disk and a
//! fake Ollama server.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gotham_data::SourcePaths;
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const HOTELS_CSV: &[u8] = b"name,address1,latitude,longitude,star_rating,low_rate,high_rate
Harbor Inn,1 Water St,40.65,-73.95,3,80,140
Harbor Inn,1 Water St,40.65,-73.95,3,80,140
Midtown Grand,5 W 44th St,40.75,-73.98,4,210,340
Caf\xe9 Suites,9 Bleecker St,40.73,-73.99,2,70,95
Zero Rate,3 Nowhere Ave,40.74,-73.97,2,0,0
Jersey Side,1 Hudson Pl,40.72,-74.2,3,120,180
";

pub const ATTRACTIONS_CSV: &str = "Tourist_Spot,Address,Zipcode
Central Park,\"Manhattan, New York, NY 10024\",10024
The Met,\"1000 5th Ave, New York, NY 10028\",10028
Prospect Park,\"Brooklyn, NY 11225\",11225
Brooklyn Museum,\"200 Eastern Pkwy, Brooklyn, NY 11238\",11238
Central Park,\"Manhattan, New York, NY 10024\",10024
Nameless,,
";

pub const RESTAURANTS_CSV: &str = "Name,Address,Lat,Lon,Cuisine,Rating,Price Category
Joe's Pizza,7 Carmine St,40.7306,-74.0021,Pizza,4.5,$
Katz's Delicatessen,205 E Houston St,40.7223,-73.9874,Deli,4.6,$$
Di Fara,1424 Avenue J,40.625,-73.961,Pizza,4.4,$$
Ghost Kitchen,,,,Thai,4.0,$
";

/// Two squares: Manhattan above 40.70 and Brooklyn below it.
pub fn boroughs_geojson() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "BoroName": "Manhattan", "BoroCode": 1 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-74.05, 40.70], [-73.90, 40.70], [-73.90, 40.90], [-74.05, 40.90], [-74.05, 40.70]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "BoroName": "Brooklyn", "BoroCode": 3 },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-74.05, 40.55], [-73.85, 40.55], [-73.85, 40.70], [-74.05, 40.70], [-74.05, 40.55]]]]
                }
            }
        ]
    })
    .to_string()
}

/// Writes the four raw sources into `dir` and returns their paths.
pub fn write_sources(dir: &Path) -> SourcePaths {
    let write = |name: &str, bytes: &[u8]| -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).expect("fixture should be writable");
        path
    };

    SourcePaths {
        hotels: write("hotels.csv", HOTELS_CSV),
        boroughs: write("boroughs.geojson", boroughs_geojson().as_bytes()),
        attractions: write("attractions.csv", ATTRACTIONS_CSV.as_bytes()),
        restaurants: write("restaurants.csv", RESTAURANTS_CSV.as_bytes()),
    }
}

/// What the fake `/api/chat` endpoint does.
#[derive(Debug, Clone)]
pub enum ChatBehaviour {
    Reply(String),
    Status(u16, String),
    Stall(Duration),
}

#[derive(Clone)]
struct FakeState {
    behaviour: ChatBehaviour,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct FakeOllama {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeOllama {
    pub async fn start(behaviour: ChatBehaviour) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            behaviour,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/chat", post(chat))
            .route("/api/tags", get(tags))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port should bind");
        let addr = listener.local_addr().expect("bound listener has an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn chat_requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

async fn chat(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    let model = body.get("model").cloned().unwrap_or(Value::Null);
    state.requests.lock().push(body);

    match state.behaviour {
        ChatBehaviour::Reply(content) => Json(json!({
            "model": model,
            "message": { "role": "assistant", "content": content },
            "done": true
        }))
        .into_response(),
        ChatBehaviour::Status(code, message) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "error": message })),
        )
            .into_response(),
        ChatBehaviour::Stall(delay) => {
            tokio::time::sleep(delay).await;
            StatusCode::OK.into_response()
        }
    }
}

async fn tags() -> Json<Value> {
    Json(json!({
        "models": [
            { "name": "qwen2.5:1.5b", "size": 986061892 },
            { "name": "llama3:latest", "size": 4661224676u64 }
        ]
    }))
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let addr = listener.local_addr().expect("bound listener has an address");
    drop(listener);
    addr
}
