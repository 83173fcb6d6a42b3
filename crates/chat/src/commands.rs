use shopbot_core::domain::session::UserId;

/// Commands recognized independently of the current dialogue state.
///
/// The router applies these in the documented pre-transition order; some
/// are only honored in context (`LeaveAdminChat` inside the admin chat,
/// `AdminReply` from the configured admin identity) and otherwise fall
/// through to the state table as plain text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalCommand {
    Start,
    LeaveAdminChat,
    AdminReply { user_id: UserId, text: String },
    Profile,
    Menu,
    Price { symbol: String },
    OrderStatus,
    Help,
    Feedback,
    CancelFeedback,
    Shop,
    Support,
}

pub fn parse_global_command(text: &str) -> Option<GlobalCommand> {
    let trimmed = text.trim();

    if let Some(reply) = parse_admin_reply(trimmed) {
        return Some(reply);
    }
    if let Some(symbol) = parse_price_lookup(trimmed) {
        return Some(GlobalCommand::Price { symbol });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "/start" | "start" | "reset" => Some(GlobalCommand::Start),
        "leave" => Some(GlobalCommand::LeaveAdminChat),
        "profile" | "/profile" => Some(GlobalCommand::Profile),
        "menu" | "return to menu" => Some(GlobalCommand::Menu),
        "orders" | "status" | "/orders" => Some(GlobalCommand::OrderStatus),
        "help" | "/help" => Some(GlobalCommand::Help),
        "feedback" => Some(GlobalCommand::Feedback),
        "cancel feedback" => Some(GlobalCommand::CancelFeedback),
        "shop" | "buy" | "/shop" => Some(GlobalCommand::Shop),
        "support" | "contact" | "/support" => Some(GlobalCommand::Support),
        _ => None,
    }
}

/// `reply:<userId>:<text>`. The text part may itself contain colons.
fn parse_admin_reply(input: &str) -> Option<GlobalCommand> {
    let rest = input.strip_prefix("reply:")?;
    let (user_id, text) = rest.split_once(':')?;
    let user_id = user_id.trim();
    let text = text.trim();
    if user_id.is_empty() || text.is_empty() {
        return None;
    }
    Some(GlobalCommand::AdminReply { user_id: UserId(user_id.to_owned()), text: text.to_owned() })
}

/// Either the prefixed form `!p SYM` or the command form `/price SYM`.
fn parse_price_lookup(input: &str) -> Option<String> {
    let rest = input
        .strip_prefix("!p ")
        .or_else(|| input.strip_prefix("!P "))
        .or_else(|| strip_command_prefix(input, "/price"))?;
    let symbol = rest.trim();
    if symbol.is_empty() || symbol.contains(char::is_whitespace) {
        return None;
    }
    Some(symbol.to_ascii_uppercase())
}

fn strip_command_prefix<'a>(input: &'a str, command: &str) -> Option<&'a str> {
    let (head, rest) = input.split_once(char::is_whitespace)?;
    head.eq_ignore_ascii_case(command).then_some(rest)
}
