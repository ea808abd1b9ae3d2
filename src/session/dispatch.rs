//! Command dispatch with the authentication gate.
//!
//! Each request line goes through, in order: empty check, lower-case check,
//! command lookup, auth gate, argument count, handler. Every path yields
//! exactly one `Response`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::{ControlPlane, ForwardOutcome, ForwardRequest};
use crate::config::BridgeConfig;
use crate::observability::metrics;
use crate::protocol::{quote_args, tokenize, Response, ResponseStatus};
use crate::session::auth::{self, AuthResult, SecretSource};
use crate::session::commands::{self, Command};
use crate::session::state::Session;
use crate::session::vcl::InlineVclSlot;

/// Immutable settings the dispatcher needs from the process configuration.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Proxy that bans are applied to.
    pub proxy_name: String,
    /// Emulated Varnish version for the banner and `param.show`.
    pub varnish_version: String,
}

impl From<&BridgeConfig> for DispatcherSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            proxy_name: config.api.proxy_name.clone(),
            varnish_version: config.protocol.varnish_version.clone(),
        }
    }
}

/// Routes tokenized requests to handlers. Shared by all connections.
pub struct Dispatcher {
    settings: DispatcherSettings,
    control_plane: Arc<dyn ControlPlane>,
    secret: Arc<dyn SecretSource>,
    inline_vcl: InlineVclSlot,
}

impl Dispatcher {
    pub fn new(
        settings: DispatcherSettings,
        control_plane: Arc<dyn ControlPlane>,
        secret: Arc<dyn SecretSource>,
    ) -> Self {
        Self {
            settings,
            control_plane,
            secret,
            inline_vcl: InlineVclSlot::new(),
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// First response on a new connection: an auth challenge.
    pub fn greet(&self, session: &mut Session) -> Response {
        auth::issue_challenge(session)
    }

    /// Tokenize and handle one raw request line (without its newline).
    pub async fn handle_line(&self, session: &mut Session, line: &[u8]) -> Response {
        let tokens = tokenize(line);
        self.dispatch(session, &tokens).await
    }

    /// Handle one tokenized request.
    pub async fn dispatch(&self, session: &mut Session, tokens: &[String]) -> Response {
        let (label, response) = self.route(session, tokens).await;
        metrics::record_command(label, response.status);
        tracing::debug!(
            command = label,
            status = response.status.code(),
            authenticated = session.is_authenticated(),
            "Request handled"
        );
        response
    }

    async fn route(&self, session: &mut Session, tokens: &[String]) -> (&'static str, Response) {
        let Some((name, args)) = tokens.split_first() else {
            return ("empty", Response::new(ResponseStatus::Syntax, "Empty request."));
        };

        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return (
                "invalid",
                Response::new(ResponseStatus::Unknown, "all commands are in lower-case."),
            );
        }

        let Some(command) = Command::from_name(name) else {
            tracing::info!(command = %name, "Unrecognised command");
            return (
                "unrecognised",
                Response::new(ResponseStatus::Unimplemented, "Unimplemented"),
            );
        };

        if command.requires_auth() && !session.is_authenticated() {
            tracing::debug!(command = command.name(), "Command before auth, re-challenging");
            return (command.name(), auth::issue_challenge(session));
        }

        if let Some(response) = check_arity(command, args.len()) {
            return (command.name(), response);
        }

        let response = match command {
            Command::Auth => self.authenticate(session, &args[0]).await,
            Command::Ping => ping(),
            Command::Banner => self.banner(),
            Command::Quit => Response::new(ResponseStatus::Close, "Closing CLI connection"),
            Command::Help => help(args.first().map(String::as_str)),
            Command::ParamShow => self.param_show(args),
            Command::Ban => self.ban(quote_args(args)).await,
            Command::BanUrl => self.ban(quote_args(&["req.url", "~", args[0].as_str()])).await,
            Command::VclInline => self.vcl_inline(&args[0], &args[1]),
            Command::VclUse => self.vcl_use(&args[0]).await,
        };
        (command.name(), response)
    }

    async fn authenticate(&self, session: &mut Session, supplied: &str) -> Response {
        let secret = match self.secret.load().await {
            Ok(secret) => secret,
            Err(e) => {
                tracing::error!(error = %e, "Cannot read CLI secret");
                return Response::new(ResponseStatus::Cant, "Secret not available.");
            }
        };

        let result = auth::check_response(session, supplied, &secret);
        metrics::record_auth(result == AuthResult::Accepted);
        match result {
            AuthResult::Accepted => {
                tracing::info!("Client authenticated");
                self.banner()
            }
            AuthResult::Rejected => {
                tracing::warn!("Authentication failed");
                auth::issue_challenge(session)
            }
        }
    }

    fn banner(&self) -> Response {
        Response::ok(commands::banner_text(&self.settings.varnish_version))
    }

    fn param_show(&self, args: &[String]) -> Response {
        let names = match args.split_first() {
            Some((flag, rest)) if flag == "-l" => rest,
            _ => args,
        };
        let version = &self.settings.varnish_version;

        match names {
            [] => Response::ok(commands::all_params(version)),
            [name] => match commands::param_description(name, version) {
                Some(text) => Response::ok(text),
                None => Response::new(
                    ResponseStatus::Param,
                    format!("Unknown parameter \"{}\".", name),
                ),
            },
            _ => Response::new(ResponseStatus::TooMany, "Too many parameters"),
        }
    }

    async fn ban(&self, expression: String) -> Response {
        tracing::info!(ban = %expression, "Forwarding ban");
        let request = ForwardRequest::Ban {
            proxy: self.settings.proxy_name.clone(),
            expression,
        };
        match self.control_plane.forward(request).await {
            ForwardOutcome::Accepted => Response::ok("Ban forwarded."),
            ForwardOutcome::Rejected { status } => api_rejected(status),
            ForwardOutcome::Failed => {
                Response::new(ResponseStatus::Cant, "Failed to forward the ban.")
            }
        }
    }

    fn vcl_inline(&self, name: &str, content: &str) -> Response {
        self.inline_vcl.record(name, content);
        tracing::info!(vcl_name = name, bytes = content.len(), "Recorded inline VCL");
        Response::ok("VCL compiled.")
    }

    async fn vcl_use(&self, name: &str) -> Response {
        let Some(content) = self.inline_vcl.content_for(name) else {
            return Response::new(
                ResponseStatus::Param,
                format!("No configuration named {} known.", name),
            );
        };

        tracing::info!(vcl_name = name, "Forwarding configuration update");
        let request = ForwardRequest::VclUpdate {
            name: name.to_string(),
            content,
        };
        match self.control_plane.forward(request).await {
            // varnishd answers a successful vcl.use with an empty 200.
            ForwardOutcome::Accepted => Response::ok(""),
            ForwardOutcome::Rejected { status } => api_rejected(status),
            ForwardOutcome::Failed => Response::new(
                ResponseStatus::Cant,
                "Failed to forward the configuration update.",
            ),
        }
    }
}

fn check_arity(command: Command, count: usize) -> Option<Response> {
    let (min, max) = command.arity();
    if count < min {
        return Some(Response::new(ResponseStatus::TooFew, "Too few parameters"));
    }
    if max.is_some_and(|max| count > max) {
        return Some(Response::new(ResponseStatus::TooMany, "Too many parameters"));
    }
    None
}

fn ping() -> Response {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Response::ok(format!("PONG {} 1.0", now))
}

fn help(topic: Option<&str>) -> Response {
    match topic {
        None => Response::ok(commands::help_text()),
        Some(name) => match Command::from_name(name) {
            Some(command) => Response::ok(commands::command_help(command)),
            None => Response::new(
                ResponseStatus::Param,
                format!("Unknown request \"{}\".", name),
            ),
        },
    }
}

fn api_rejected(status: u16) -> Response {
    Response::new(
        ResponseStatus::Cant,
        format!("API responded with status {}.", status),
    )
}
