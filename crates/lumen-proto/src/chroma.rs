// ── Razer Chroma SDK client ──
//
// Stateful REST session against the local Chroma service. `connect()`
// registers the application and receives a session id plus a session-scoped
// base URI; every later call goes through that URI. The service silently
// revokes sessions that miss their heartbeat window, so the shared
// heartbeat task must call `heartbeat()` more often than the expiry.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::client::{ProtocolClient, ProtocolKind};
use crate::color::{Color, EffectDescriptor, EffectKind};
use crate::error::Error;
use crate::report::{CapabilitySet, DeviceObservation, ZoneObservation};
use crate::transport::TransportConfig;

/// Default local endpoint of the Chroma SDK REST service.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:54235/razer/chromasdk";

/// The SDK cannot enumerate hardware, so the client is configured up front
/// with the device classes it should report and drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaDeviceSpec {
    /// SDK device class: `keyboard`, `mouse`, `headset`, `mousepad`,
    /// `keypad`, or `chromalink`. Doubles as the control address.
    pub device_class: String,
    /// Display name, e.g. "Razer Basilisk".
    pub name: String,
    /// Named lighting regions with their LED counts, for topology reporting.
    /// The effect API is device-wide, so these are informational.
    pub zones: Vec<(String, u32)>,
}

#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub endpoint: String,
    /// Application identity sent during session init.
    pub app_title: String,
    pub app_description: String,
    pub author_name: String,
    pub author_contact: String,
    pub devices: Vec<ChromaDeviceSpec>,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_title: "Lumen".to_string(),
            app_description: "Unified lighting control".to_string(),
            author_name: "lumen".to_string(),
            author_contact: "https://github.com/lumen-rgb/lumen".to_string(),
            devices: vec![ChromaDeviceSpec {
                device_class: "mouse".to_string(),
                name: "Razer Chroma Mouse".to_string(),
                zones: vec![
                    ("logo".to_string(), 1),
                    ("scroll_wheel".to_string(), 1),
                    ("left_side".to_string(), 7),
                    ("right_side".to_string(), 7),
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    sessionid: u64,
    uri: String,
}

/// Result envelope some endpoints return with HTTP 200.
#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    result: Option<i64>,
}

#[derive(Debug, Clone)]
struct Session {
    id: u64,
    uri: Url,
}

/// Client for the Razer Chroma SDK backend.
pub struct ChromaClient {
    name: String,
    http: reqwest::Client,
    config: ChromaConfig,
    timeout_ms: u64,
    session: Mutex<Option<Session>>,
}

impl ChromaClient {
    pub fn new(config: ChromaConfig, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            name: format!("chroma@{}", config.endpoint),
            http,
            config,
            timeout_ms: u64::try_from(transport.timeout.as_millis()).unwrap_or(u64::MAX),
            session: Mutex::new(None),
        })
    }

    fn map_http(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if e.is_connect() {
            Error::ConnectionRefused {
                endpoint: self.config.endpoint.clone(),
            }
        } else {
            Error::Transport(e)
        }
    }

    /// Open a session if none is active, returning the session URI.
    async fn ensure_session(&self) -> Result<Session, Error> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let init = json!({
            "title": self.config.app_title,
            "description": self.config.app_description,
            "author": {
                "name": self.config.author_name,
                "contact": self.config.author_contact,
            },
            "device_supported": [
                "keyboard", "mouse", "headset", "mousepad", "keypad", "chromalink"
            ],
            "category": "application",
        });

        let resp = self
            .http
            .post(&self.config.endpoint)
            .json(&init)
            .send()
            .await
            .map_err(|e| self.map_http(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Protocol {
                message: format!("session init rejected with HTTP {status}"),
            });
        }

        let body: InitResponse = resp.json().await.map_err(|e| Error::Protocol {
            message: format!("malformed session init response: {e}"),
        })?;
        let uri = Url::parse(&body.uri)?;
        debug!(backend = %self.name, session = body.sessionid, "session established");

        let session = Session {
            id: body.sessionid,
            uri,
        };
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Drop the session so the next use re-registers.
    async fn revoke_session(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            warn!(backend = %self.name, session = session.id, "session revoked");
        }
    }

    fn session_url(session: &Session, path: &str) -> Result<Url, Error> {
        // The session URI has no trailing slash; join() would replace the
        // last segment, so build by string concatenation.
        let base = session.uri.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// PUT a JSON body against a session-scoped path, handling session
    /// revocation and the `{"result": N}` envelope.
    async fn put_session(&self, path: &str, body: &serde_json::Value) -> Result<(), Error> {
        let session = self.ensure_session().await?;
        let url = Self::session_url(&session, path)?;
        debug!(backend = %self.name, %url, "PUT");

        let resp = self
            .http
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_http(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::NOT_FOUND {
            // The service answers 404/401 on revoked session URIs.
            self.revoke_session().await;
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::Protocol {
                message: format!("HTTP {status} from {path}"),
            });
        }

        match resp.json::<ResultEnvelope>().await {
            Ok(ResultEnvelope {
                result: Some(code),
            }) if code != 0 => Err(Error::Protocol {
                message: format!("backend result code {code} from {path}"),
            }),
            _ => Ok(()),
        }
    }

    fn effect_body(effect: EffectDescriptor) -> Result<serde_json::Value, Error> {
        let packed = effect.color.unwrap_or(Color::BLACK).packed_rgb();
        let body = match effect.kind {
            EffectKind::Static => json!({
                "effect": "CHROMA_STATIC",
                "param": { "color": packed },
            }),
            EffectKind::Breathing => json!({
                "effect": "CHROMA_BREATHING",
                "param": { "color": packed },
            }),
            EffectKind::SpectrumCycle | EffectKind::Rainbow | EffectKind::Wave => json!({
                "effect": "CHROMA_SPECTRUM_CYCLING",
            }),
            EffectKind::Reactive => json!({
                "effect": "CHROMA_REACTIVE",
                "param": { "color": packed, "duration": 2 },
            }),
            EffectKind::Off => json!({
                "effect": "CHROMA_NONE",
            }),
        };
        Ok(body)
    }

    fn spec_for(&self, device: &str) -> Option<&ChromaDeviceSpec> {
        self.config
            .devices
            .iter()
            .find(|d| d.device_class == device)
    }
}

#[async_trait::async_trait]
impl ProtocolClient for ChromaClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Chroma
    }

    async fn connect(&self) -> Result<(), Error> {
        self.ensure_session().await.map(|_| ())
    }

    async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            let url = session.uri.clone();
            if let Err(e) = self.http.delete(url).send().await {
                debug!(backend = %self.name, error = %e, "session release failed (ignored)");
            }
        }
    }

    async fn list_devices(&self) -> Result<Vec<DeviceObservation>, Error> {
        // Enumeration is fixed-topology, but still requires a live session
        // so an absent backend is reported as an error, not as devices.
        self.ensure_session().await?;

        Ok(self
            .config
            .devices
            .iter()
            .map(|spec| DeviceObservation {
                vendor: "Razer".to_string(),
                serial_or_path: spec.device_class.clone(),
                name: spec.name.clone(),
                protocol: ProtocolKind::Chroma,
                zones: spec
                    .zones
                    .iter()
                    .enumerate()
                    .map(|(i, (name, led_count))| ZoneObservation {
                        zone_id: u32::try_from(i).unwrap_or(u32::MAX),
                        name: Some(name.clone()),
                        led_count: *led_count,
                        color: None,
                    })
                    .collect(),
                capabilities: CapabilitySet {
                    effects: vec![
                        EffectKind::Static,
                        EffectKind::Breathing,
                        EffectKind::SpectrumCycle,
                        EffectKind::Reactive,
                        EffectKind::Off,
                    ],
                    color_depth_bits: 8,
                    // The REST effect API addresses whole device classes.
                    zone_control: false,
                },
                identity_hint: None,
            })
            .collect())
    }

    async fn set_zone_color(&self, device: &str, zone_id: u32, _color: Color) -> Result<(), Error> {
        if self.spec_for(device).is_none() {
            return Err(Error::DeviceNotFound {
                device: device.to_string(),
            });
        }
        Err(Error::UnsupportedOperation {
            operation: format!("zone {zone_id} color on chroma device {device}"),
        })
    }

    async fn set_effect(&self, device: &str, effect: EffectDescriptor) -> Result<(), Error> {
        if self.spec_for(device).is_none() {
            return Err(Error::DeviceNotFound {
                device: device.to_string(),
            });
        }
        let body = Self::effect_body(effect)?;
        self.put_session(device, &body).await
    }

    async fn heartbeat(&self) -> Result<(), Error> {
        self.put_session("heartbeat", &json!({})).await
    }
}
