//! Command table and static response texts.

/// CLI commands the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Auth,
    Ping,
    Banner,
    Quit,
    Help,
    ParamShow,
    Ban,
    BanUrl,
    VclInline,
    VclUse,
}

/// Listed by `help`, in this order.
const HELP_ORDER: [Command; 10] = [
    Command::Help,
    Command::Ping,
    Command::Auth,
    Command::Quit,
    Command::Banner,
    Command::VclInline,
    Command::VclUse,
    Command::ParamShow,
    Command::BanUrl,
    Command::Ban,
];

impl Command {
    /// Look up a command by its exact (lower-case) wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name {
            "auth" => Command::Auth,
            "ping" => Command::Ping,
            "banner" => Command::Banner,
            "quit" => Command::Quit,
            "help" => Command::Help,
            "param.show" => Command::ParamShow,
            "ban" => Command::Ban,
            "ban.url" => Command::BanUrl,
            "vcl.inline" => Command::VclInline,
            "vcl.use" => Command::VclUse,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Auth => "auth",
            Command::Ping => "ping",
            Command::Banner => "banner",
            Command::Quit => "quit",
            Command::Help => "help",
            Command::ParamShow => "param.show",
            Command::Ban => "ban",
            Command::BanUrl => "ban.url",
            Command::VclInline => "vcl.inline",
            Command::VclUse => "vcl.use",
        }
    }

    /// Whether the command is refused (with a new challenge) before auth.
    pub fn requires_auth(self) -> bool {
        !matches!(
            self,
            Command::Auth | Command::Ping | Command::Banner | Command::Quit
        )
    }

    /// Accepted argument count range, excluding the command name.
    /// `None` as the maximum means unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Command::Auth => (1, Some(1)),
            Command::Ping => (0, Some(1)),
            Command::Banner | Command::Quit => (0, Some(0)),
            Command::Help => (0, Some(1)),
            Command::ParamShow => (0, Some(2)),
            Command::Ban => (3, None),
            Command::BanUrl => (1, Some(1)),
            Command::VclInline => (2, Some(2)),
            Command::VclUse => (1, Some(1)),
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Command::Auth => "auth <response>",
            Command::Ping => "ping [<timestamp>]",
            Command::Banner => "banner",
            Command::Quit => "quit",
            Command::Help => "help [<command>]",
            Command::ParamShow => "param.show [-l] [<param>]",
            Command::Ban => "ban <field> <operator> <arg> [&& <field> <oper> <arg>]...",
            Command::BanUrl => "ban.url <regexp>",
            Command::VclInline => "vcl.inline <configname> <quoted_VCLstring>",
            Command::VclUse => "vcl.use <configname>",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Command::Auth => "Authenticate.",
            Command::Ping => "Keep connection alive.",
            Command::Banner => "Print welcome banner.",
            Command::Quit => "Close connection.",
            Command::Help => "Show command/protocol help.",
            Command::ParamShow => "Show parameters and their values.",
            Command::Ban => "Mark obsolete all objects where all the conditions match.",
            Command::BanUrl => "Mark obsolete all objects where the URL matches the regexp.",
            Command::VclInline => "Compile and load the VCL data under the name provided.",
            Command::VclUse => "Switch to the named configuration immediately.",
        }
    }
}

/// Body of `help` with no argument.
pub fn help_text() -> String {
    let mut text = String::new();
    for command in HELP_ORDER {
        text.push_str(command.usage());
        text.push('\n');
    }
    text
}

/// Body of `help <command>`.
pub fn command_help(command: Command) -> String {
    format!("{}\n    {}\n", command.usage(), command.description())
}

/// Welcome banner. Clients parse the first `varnish-X.Y` match to pick a
/// dialect, so nothing before it may contain `varnish-`.
pub fn banner_text(varnish_version: &str) -> String {
    format!(
        "-----------------------------\n\
         Varnish Cache CLI Bridge\n\
         -----------------------------\n\
         varnish-{}\n\
         \n\
         Type 'help' for command list.\n\
         Type 'quit' to close CLI session.",
        varnish_version
    )
}

/// Parameters `param.show` knows about.
const KNOWN_PARAMS: [&str; 2] = ["cli_buffer", "esi_syntax"];

/// Description of a known parameter in the layout of the emulated version.
pub fn param_description(name: &str, varnish_version: &str) -> Option<&'static str> {
    let modern = major_version(varnish_version) >= 4;
    match name {
        "cli_buffer" if modern => Some(CLI_BUFFER_V4),
        "cli_buffer" => Some(CLI_BUFFER_V3),
        "esi_syntax" => Some(ESI_SYNTAX),
        _ => None,
    }
}

/// All known parameters, as printed by a bare `param.show`.
pub fn all_params(varnish_version: &str) -> String {
    KNOWN_PARAMS
        .iter()
        .filter_map(|name| param_description(name, varnish_version))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leading numeric component of a version such as `4.1.1`; unparseable
/// versions are treated as current.
fn major_version(version: &str) -> u32 {
    version
        .trim_start_matches("varnish-")
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .unwrap_or(4)
}

const ESI_SYNTAX: &str = "\
esi_syntax                  2 [bitmap]
                            Default is 0
                            Bitmap controlling ESI parsing code:
                              0x00000001 - Don't check if it looks like XML
                              0x00000002 - Ignore non-esi elements
                              0x00000004 - Emit parsing debug records
                              0x00000008 - Force-split parser input
                            (debugging)
                            Use 0x notation and do the bitor in your head :-)
";

const CLI_BUFFER_V3: &str = "\
cli_buffer                  32768 [bytes]
                            Default is 8192
                            Size of buffer for CLI input.
                            You may need to increase this if you have big VCL
                            files and use the vcl.inline CLI command.
                            NB: Must be specified with -p to have effect.
";

const CLI_BUFFER_V4: &str = "\
cli_buffer
        Value is: 32k [bytes]
        Default is: 8k
        Minimum is: 4k

        Size of buffer for CLI command input.
        You may need to increase this if you have big VCL files and use
        the vcl.inline CLI command.
        NB: Must be specified with -p to have effect.
";
