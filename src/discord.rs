//! Discord transport: REST presenter and gateway listener.
//!
//! [`DiscordPresenter`] renders pages as embeds with navigation buttons.
//! [`DiscordGateway`] turns gateway dispatches into `future` commands and
//! button presses on paginated messages.

use crate::config::DiscordConfig;
use crate::pages::{DURATION_PAD as EM_QUAD, Page, PageEntry};
use crate::present::{OutputId, PresentError, Presenter};
use crate::session::NavEvent;
use async_trait::async_trait;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Prefix of every navigation button `custom_id`.
const CONTROL_PREFIX: &str = "page:";

/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
const GATEWAY_INTENTS: u64 = 1 | (1 << 9) | (1 << 15);

/// Deferred update acknowledgement for component interactions.
const INTERACTION_DEFERRED_UPDATE: u64 = 6;

/// Component interaction type.
const INTERACTION_MESSAGE_COMPONENT: u64 = 3;

const LINK_GLYPH: char = '\u{2B14}';

/// One contest rendered as an embed field value.
pub fn entry_line(entry: &PageEntry) -> String {
    format!(
        "`{EM_QUAD}{id}{EM_QUAD}|{EM_QUAD}{start}{EM_QUAD}|{EM_QUAD}{duration}{EM_QUAD}|{EM_QUAD}`[`link {LINK_GLYPH}`]({url} \"Link to contest page\")",
        id = entry.id,
        start = entry.start,
        duration = entry.duration,
        url = entry.url,
    )
}

/// Build the embed for a page.
pub fn page_embed(page: &Page) -> Value {
    let mut embed = json!({ "title": page.title, "color": page.color });
    if let Some(notice) = &page.notice {
        embed["description"] = json!(notice);
    }
    if !page.entries.is_empty() {
        let fields: Vec<Value> = page
            .entries
            .iter()
            .map(|entry| json!({ "name": entry.name, "value": entry_line(entry), "inline": false }))
            .collect();
        embed["fields"] = Value::Array(fields);
    }
    if page.total > 1 {
        embed["footer"] = json!({ "text": page.footer() });
    }
    embed
}

/// Action row with first/previous/next/last/close buttons.
pub fn nav_components() -> Value {
    let button = |event: NavEvent, label: &str| {
        json!({
            "type": 2,
            "style": 2,
            "label": label,
            "custom_id": format!("{CONTROL_PREFIX}{}", event.control_id()),
        })
    };
    json!([{
        "type": 1,
        "components": [
            button(NavEvent::First, "\u{23EE}"),
            button(NavEvent::Previous, "\u{25C0}"),
            button(NavEvent::Next, "\u{25B6}"),
            button(NavEvent::Last, "\u{23ED}"),
            button(NavEvent::Close, "\u{23F9}"),
        ]
    }])
}

/// Discord REST presenter.
pub struct DiscordPresenter {
    api_base: String,
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordPresenter {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_base)
    }

    fn message_url(&self, output: &OutputId) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.api_base, output.channel_id, output.message_id
        )
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<Value, PresentError> {
        let response = request
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(body)
            .send()
            .await
            .map_err(|e| PresentError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PresentError::Gone);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PresentError::Transport(format!(
                "discord request failed ({status}): {body}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| PresentError::Transport(format!("unreadable discord response: {e}")))
    }
}

#[async_trait]
impl Presenter for DiscordPresenter {
    async fn publish(
        &self,
        target: &str,
        page: &Page,
        controls: bool,
    ) -> Result<OutputId, PresentError> {
        let components = if controls { nav_components() } else { json!([]) };
        let body = json!({ "embeds": [page_embed(page)], "components": components });
        let created = self
            .send_json(self.client.post(self.messages_url(target)), &body)
            .await?;

        let message_id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PresentError::Transport("discord response missing message id".to_owned()))?;
        Ok(OutputId::new(target, message_id))
    }

    async fn update(&self, output: &OutputId, page: &Page) -> Result<(), PresentError> {
        let body = json!({ "embeds": [page_embed(page)] });
        self.send_json(self.client.patch(self.message_url(output)), &body)
            .await
            .map(|_| ())
    }

    async fn freeze(&self, output: &OutputId) -> Result<(), PresentError> {
        let body = json!({ "components": [] });
        self.send_json(self.client.patch(self.message_url(output)), &body)
            .await
            .map(|_| ())
    }

    async fn notify(&self, target: &str, text: &str) -> Result<(), PresentError> {
        let body = json!({ "embeds": [{ "description": text }] });
        self.send_json(self.client.post(self.messages_url(target)), &body)
            .await
            .map(|_| ())
    }
}

/// Inbound request decoded from a gateway dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// `{prefix}future ...` typed in a guild channel.
    Command { channel_id: String, args: String },
    /// Navigation button pressed on a paginated message.
    Navigation {
        interaction_id: String,
        interaction_token: String,
        output: OutputId,
        event: NavEvent,
    },
}

/// Decode a gateway payload into a [`GatewayEvent`], if it is one we handle.
pub fn parse_dispatch(payload: &Value, prefix: &str, bot_user_id: &str) -> Option<GatewayEvent> {
    let event_name = payload.get("t").and_then(Value::as_str)?;
    let data = payload.get("d")?;
    match event_name {
        "MESSAGE_CREATE" => parse_message(data, prefix, bot_user_id),
        "INTERACTION_CREATE" => parse_interaction(data),
        _ => None,
    }
}

fn parse_message(data: &Value, prefix: &str, bot_user_id: &str) -> Option<GatewayEvent> {
    let author = data.get("author")?;
    let author_id = author.get("id").and_then(Value::as_str).unwrap_or_default();
    if author_id.is_empty() || author_id == bot_user_id {
        return None;
    }
    if author.get("bot").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    // Commands are only served inside guild channels.
    data.get("guild_id").and_then(Value::as_str)?;

    let channel_id = data.get("channel_id").and_then(Value::as_str)?;
    let content = data.get("content").and_then(Value::as_str)?.trim();
    let rest = content.strip_prefix(prefix)?.strip_prefix("future")?;
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }

    Some(GatewayEvent::Command {
        channel_id: channel_id.to_owned(),
        args: rest.trim().to_owned(),
    })
}

fn parse_interaction(data: &Value) -> Option<GatewayEvent> {
    if data.get("type").and_then(Value::as_u64) != Some(INTERACTION_MESSAGE_COMPONENT) {
        return None;
    }
    let custom_id = data
        .get("data")
        .and_then(|d| d.get("custom_id"))
        .and_then(Value::as_str)?;
    let event = NavEvent::from_control_id(custom_id.strip_prefix(CONTROL_PREFIX)?)?;

    let channel_id = data.get("channel_id").and_then(Value::as_str)?;
    let message_id = data
        .get("message")
        .and_then(|m| m.get("id"))
        .and_then(Value::as_str)?;

    Some(GatewayEvent::Navigation {
        interaction_id: data.get("id").and_then(Value::as_str)?.to_owned(),
        interaction_token: data.get("token").and_then(Value::as_str)?.to_owned(),
        output: OutputId::new(channel_id, message_id),
        event,
    })
}

/// Gateway websocket listener.
pub struct DiscordGateway {
    bot_token: String,
    api_base: String,
    command_prefix: String,
    client: reqwest::Client,
}

impl DiscordGateway {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            command_prefix: config.command_prefix.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn bot_user_id_from_token(token: &str) -> Option<String> {
        let first = token.split('.').next()?;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(first)
            .ok()?;
        String::from_utf8(decoded).ok()
    }

    /// Acknowledge a button press so the client stops showing a spinner.
    async fn acknowledge(&self, interaction_id: &str, token: &str) -> anyhow::Result<()> {
        let url = format!(
            "{}/interactions/{interaction_id}/{token}/callback",
            self.api_base
        );
        let response = self
            .client
            .post(&url)
            .json(&json!({ "type": INTERACTION_DEFERRED_UPDATE }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("interaction ack failed ({})", response.status());
        }
        Ok(())
    }

    /// Connect and forward decoded events until the socket closes.
    pub async fn run(&self, inbound_tx: mpsc::Sender<GatewayEvent>) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("discord bot token is empty");
        }

        let bot_user_id = Self::bot_user_id_from_token(&self.bot_token).unwrap_or_default();

        let gateway_resp: Value = self
            .client
            .get(format!("{}/gateway/bot", self.api_base))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .send()
            .await?
            .json()
            .await?;

        let gateway_url = gateway_resp
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("wss://gateway.discord.gg");
        let ws_url = format!("{gateway_url}/?v=10&encoding=json");

        let (stream, _) = tokio_tungstenite::connect_async(&ws_url).await?;
        let (mut write, mut read) = stream.split();

        let hello = read
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("no hello"))??;
        let hello_text = match hello {
            Message::Text(text) => text.to_string(),
            _ => anyhow::bail!("unexpected discord hello payload"),
        };
        let hello_json: Value = serde_json::from_str(&hello_text)?;
        let heartbeat_interval_ms = hello_json
            .get("d")
            .and_then(|v| v.get("heartbeat_interval"))
            .and_then(Value::as_u64)
            .unwrap_or(41_250);

        let identify = json!({
            "op": 2,
            "d": {
                "token": self.bot_token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "contest-watch",
                    "device": "contest-watch"
                }
            }
        });
        write.send(Message::Text(identify.to_string())).await?;

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval_ms));
        let mut last_sequence = Value::Null;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = json!({"op": 1, "d": last_sequence});
                    if write.send(Message::Text(beat.to_string())).await.is_err() {
                        anyhow::bail!("discord heartbeat failed");
                    }
                }
                maybe_msg = read.next() => {
                    let raw = match maybe_msg {
                        Some(Ok(Message::Text(text))) => text.to_string(),
                        Some(Ok(Message::Close(_))) | None => {
                            anyhow::bail!("discord websocket closed");
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => anyhow::bail!("discord websocket error: {err}"),
                    };

                    let payload: Value = match serde_json::from_str(&raw) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    if let Some(seq) = payload.get("s").filter(|s| !s.is_null()) {
                        last_sequence = seq.clone();
                    }

                    let Some(event) = parse_dispatch(&payload, &self.command_prefix, &bot_user_id) else {
                        continue;
                    };
                    if let GatewayEvent::Navigation { interaction_id, interaction_token, .. } = &event {
                        if let Err(e) = self.acknowledge(interaction_id, interaction_token).await {
                            warn!("could not acknowledge interaction: {e}");
                        }
                    }
                    debug!(?event, "gateway event");
                    if inbound_tx.send(event).await.is_err() {
                        anyhow::bail!("discord inbound channel closed");
                    }
                }
            }
        }
    }
}
