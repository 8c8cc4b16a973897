use anyhow::{anyhow, bail, Result};
use log::debug;
use std::time::Duration;

use zapboard::models::{ApiSettingsUpdate, NewContact, SessionStatus, SessionUpdate};
use zapboard::store::{BulkCampaign, BulkRecipient, ContactFilter, LogFilter, Store};
use zapboard::store::bulk::DEFAULT_PREVIEW_LIMIT;
use zapboard::{ContactCategory, LogLevel};

pub const HELP: &str = "\
Commands (quote or escape arguments containing spaces):
  stats
  sessions [active|counts]
  session create <client name> <webhook url>
  session status <id> <connected|waiting-qr|disconnected|initializing>
  session qr <id> <payload>
  session delete <id>
  session refresh <id>
  session test <id>
  contacts [counts]
  contacts find [category|all] [search]
  contact add <name> <phone> [Cliente|Lead|Fornecedor|Outro]
  contact remove <id>
  contact import <name> <phone> [<name> <phone> ...]
  send <session id> <to> <content>
  messages [counts]
  groups
  groups load <session id>
  groups extract <group id>
  settings
  settings set <url|timeout|refresh> <value>
  settings reset
  settings test
  webhooks
  webhook add <url>
  webhook remove <id>
  webhook test <id>
  webhook events [id]
  logs [level|all] [search]
  logs export [level|all] [search]
  logs clear
  bulk preview <session id> <template> <name> <phone> [...]
  bulk send <session id> <template> <delay ms> <name> <phone> [...]
  help
  quit";

#[derive(Debug)]
pub enum Command {
    Help,
    Quit,
    Stats,
    Sessions { active_only: bool },
    SessionCounts,
    CreateSession { client_name: String, webhook_url: String },
    UpdateSession { id: String, update: SessionUpdate },
    DeleteSession { id: String },
    RefreshSession { id: String },
    TestSession { id: String },
    Contacts,
    FindContacts(ContactFilter),
    CategoryCounts,
    AddContact(NewContact),
    RemoveContact { id: String },
    ImportContacts(Vec<NewContact>),
    Send { session_id: String, to: String, content: String },
    Messages,
    MessageCounts,
    Groups,
    LoadGroups { session_id: String },
    ExtractGroup { id: String },
    Settings,
    UpdateSettings(ApiSettingsUpdate),
    ResetSettings,
    TestConnection,
    Webhooks,
    AddWebhook { url: String },
    RemoveWebhook { id: String },
    TestWebhook { id: String },
    WebhookEvents { id: Option<String> },
    Logs(LogFilter),
    ExportLogs(LogFilter),
    ClearLogs,
    BulkPreview(BulkCampaign),
    BulkSend(BulkCampaign),
}

/// Split a line into shell-style words (single/double quotes, backslash escapes).
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    shell_words::split(line.trim()).map_err(|e| anyhow!("cannot parse '{}': {}", line.trim(), e))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("missing <{}>", name))
}

fn pairs_to_recipients(args: &[String]) -> Result<Vec<BulkRecipient>> {
    if args.is_empty() || args.len() % 2 != 0 {
        bail!("expected <name> <phone> pairs");
    }
    Ok(args
        .chunks(2)
        .map(|pair| BulkRecipient::new(pair[0].clone(), pair[1].clone()))
        .collect())
}

fn parse_contact_filter(args: &[String]) -> Result<ContactFilter> {
    let mut filter = ContactFilter::default();
    let mut rest = args;
    if let Some(first) = rest.first() {
        if first == "all" {
            rest = &rest[1..];
        } else if let Ok(category) = first.parse::<ContactCategory>() {
            filter.category = Some(category);
            rest = &rest[1..];
        }
    }
    if !rest.is_empty() {
        filter.search = Some(rest.join(" "));
    }
    Ok(filter)
}

fn parse_log_filter(args: &[String]) -> Result<LogFilter> {
    let mut filter = LogFilter::default();
    let mut rest = args;
    if let Some(first) = rest.first() {
        if first == "all" {
            rest = &rest[1..];
        } else if let Ok(level) = first.parse::<LogLevel>() {
            filter.level = Some(level);
            rest = &rest[1..];
        }
    }
    if !rest.is_empty() {
        filter.search = Some(rest.join(" "));
    }
    Ok(filter)
}

pub fn parse(line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line)?;
    let Some((head, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let sub = args.first().map(|s| s.as_str());
    let rest = if args.is_empty() { args } else { &args[1..] };

    let command = match (head.as_str(), sub) {
        ("help", _) => Command::Help,
        ("quit", _) | ("exit", _) => Command::Quit,
        ("stats", _) => Command::Stats,

        ("sessions", None) => Command::Sessions { active_only: false },
        ("sessions", Some("active")) => Command::Sessions { active_only: true },
        ("sessions", Some("counts")) => Command::SessionCounts,
        ("session", Some("create")) => Command::CreateSession {
            client_name: arg(rest, 0, "client name")?.to_string(),
            webhook_url: arg(rest, 1, "webhook url")?.to_string(),
        },
        ("session", Some("status")) => Command::UpdateSession {
            id: arg(rest, 0, "id")?.to_string(),
            update: SessionUpdate::status(arg(rest, 1, "status")?.parse::<SessionStatus>()?),
        },
        ("session", Some("qr")) => Command::UpdateSession {
            id: arg(rest, 0, "id")?.to_string(),
            update: SessionUpdate {
                qr_code: Some(arg(rest, 1, "payload")?.to_string()),
                ..Default::default()
            },
        },
        ("session", Some("delete")) => Command::DeleteSession { id: arg(rest, 0, "id")?.to_string() },
        ("session", Some("refresh")) => Command::RefreshSession { id: arg(rest, 0, "id")?.to_string() },
        ("session", Some("test")) => Command::TestSession { id: arg(rest, 0, "id")?.to_string() },

        ("contacts", None) => Command::Contacts,
        ("contacts", Some("counts")) => Command::CategoryCounts,
        ("contacts", Some("find")) => Command::FindContacts(parse_contact_filter(rest)?),
        ("contact", Some("add")) => {
            let mut contact = NewContact::new(arg(rest, 0, "name")?, arg(rest, 1, "phone")?);
            if let Some(category) = rest.get(2) {
                contact = contact.with_category(category.parse()?);
            }
            Command::AddContact(contact)
        }
        ("contact", Some("remove")) => Command::RemoveContact { id: arg(rest, 0, "id")?.to_string() },
        ("contact", Some("import")) => Command::ImportContacts(
            pairs_to_recipients(rest)?
                .into_iter()
                .map(|r| NewContact::new(r.name, r.phone))
                .collect(),
        ),

        ("send", Some(session_id)) => Command::Send {
            session_id: session_id.to_string(),
            to: arg(rest, 0, "to")?.to_string(),
            content: {
                if rest.len() < 2 {
                    bail!("missing <content>");
                }
                rest[1..].join(" ")
            },
        },
        ("messages", Some("counts")) => Command::MessageCounts,
        ("messages", _) => Command::Messages,

        ("groups", None) => Command::Groups,
        ("groups", Some("load")) => Command::LoadGroups { session_id: arg(rest, 0, "session id")?.to_string() },
        ("groups", Some("extract")) => Command::ExtractGroup { id: arg(rest, 0, "group id")?.to_string() },

        ("settings", None) => Command::Settings,
        ("settings", Some("set")) => {
            let value = arg(rest, 1, "value")?;
            let mut update = ApiSettingsUpdate::default();
            match arg(rest, 0, "field")? {
                "url" => update.api_url = Some(value.to_string()),
                "timeout" => update.timeout = Some(value.parse()?),
                "refresh" => update.auto_refresh_interval = Some(value.parse()?),
                other => bail!("unknown setting '{}'", other),
            }
            Command::UpdateSettings(update)
        }
        ("settings", Some("reset")) => Command::ResetSettings,
        ("settings", Some("test")) => Command::TestConnection,

        ("webhooks", None) => Command::Webhooks,
        ("webhook", Some("add")) => Command::AddWebhook { url: arg(rest, 0, "url")?.to_string() },
        ("webhook", Some("remove")) => Command::RemoveWebhook { id: arg(rest, 0, "id")?.to_string() },
        ("webhook", Some("test")) => Command::TestWebhook { id: arg(rest, 0, "id")?.to_string() },
        ("webhook", Some("events")) => Command::WebhookEvents { id: rest.first().cloned() },

        ("logs", Some("clear")) => Command::ClearLogs,
        ("logs", Some("export")) => Command::ExportLogs(parse_log_filter(rest)?),
        ("logs", _) => Command::Logs(parse_log_filter(args)?),

        ("bulk", Some("preview")) => {
            let session_id = arg(rest, 0, "session id")?;
            let template = arg(rest, 1, "template")?;
            let recipients = pairs_to_recipients(rest.get(2..).unwrap_or_default())?;
            Command::BulkPreview(BulkCampaign::new(session_id, template, recipients))
        }
        ("bulk", Some("send")) => {
            let session_id = arg(rest, 0, "session id")?;
            let template = arg(rest, 1, "template")?;
            let delay_ms: u64 = arg(rest, 2, "delay ms")?.parse()?;
            let recipients = pairs_to_recipients(rest.get(3..).unwrap_or_default())?;
            let mut campaign = BulkCampaign::new(session_id, template, recipients);
            campaign.delay_between = Duration::from_millis(delay_ms);
            Command::BulkSend(campaign)
        }

        _ => bail!("unknown command '{}', try 'help'", line.trim()),
    };
    Ok(Some(command))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one command against the store. Returns false when the console should exit.
pub async fn execute(store: &Store, command: Command) -> Result<bool> {
    debug!("Executing {:?}", command);
    match command {
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(false),
        Command::Stats => {
            let stats = store.stats().await;
            println!(
                "API {} | sessões ativas: {} | mensagens hoje: {} | contatos: {} | grupos: {}",
                if store.is_api_online() { "online" } else { "offline" },
                stats.active_sessions,
                stats.messages_today,
                stats.total_contacts,
                stats.total_groups
            );
        }
        Command::Sessions { active_only } => {
            let sessions = if active_only { store.active_sessions().await } else { store.sessions().await };
            for s in sessions {
                println!(
                    "{:<12} {:<24} {:<14} {} ({})",
                    s.id,
                    s.client_name,
                    s.status,
                    s.webhook_url,
                    s.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::SessionCounts => {
            for (status, count) in store.session_status_counts().await {
                println!("{:<14} {}", status, count);
            }
        }
        Command::CreateSession { client_name, webhook_url } => {
            let session = store.create_session(&client_name, &webhook_url).await;
            println!("{} {}", session.id, session.status);
        }
        Command::UpdateSession { id, update } => {
            if !store.update_session(&id, update).await {
                println!("no session {}", id);
            }
        }
        Command::DeleteSession { id } => {
            store.delete_session(&id).await;
        }
        Command::RefreshSession { id } => {
            if !store.refresh_session(&id).await {
                println!("no session {}", id);
            }
        }
        Command::TestSession { id } => {
            if !store.test_session(&id).await {
                println!("no session {}", id);
            }
        }
        Command::Contacts => {
            for c in store.contacts().await {
                println!("{:<12} {:<24} {:<16} {}", c.id, c.name, c.phone, c.category);
            }
        }
        Command::FindContacts(filter) => {
            for c in store.contacts_filtered(&filter).await {
                println!("{:<12} {:<24} {:<16} {}", c.id, c.name, c.phone, c.category);
            }
        }
        Command::CategoryCounts => {
            for (category, count) in store.category_counts().await {
                println!("{:<12} {}", category, count);
            }
        }
        Command::AddContact(contact) => {
            let contact = store.add_contact(contact).await;
            println!("{}", contact.id);
        }
        Command::RemoveContact { id } => {
            store.remove_contact(&id).await;
        }
        Command::ImportContacts(batch) => {
            let imported = store.import_contacts(batch).await;
            println!("{} imported", imported.len());
        }
        Command::Send { session_id, to, content } => {
            let message = store.send_message(&session_id, &to, &content).await;
            println!("{} {}", message.id, message.status);
        }
        Command::Messages => {
            for m in store.messages().await {
                println!(
                    "{:<10} {:<12} {:<16} {:<10} {}",
                    m.id,
                    m.session_id,
                    m.to,
                    m.status,
                    m.content
                );
            }
        }
        Command::MessageCounts => {
            for (status, count) in store.message_status_counts().await {
                println!("{:<10} {}", status, count);
            }
        }
        Command::Groups => {
            for g in store.groups().await {
                println!("{:<4} {:<20} {:>4} participantes {:>3} não lidas", g.id, g.name, g.participants_count, g.unread_count);
            }
        }
        Command::LoadGroups { session_id } => {
            store.load_groups(&session_id).await;
        }
        Command::ExtractGroup { id } => {
            if !store.extract_group_contacts(&id).await {
                println!("group {} not loaded", id);
            }
        }
        Command::Settings => print_json(&store.api_settings().await)?,
        Command::UpdateSettings(update) => {
            store.update_api_settings(update).await;
        }
        Command::ResetSettings => {
            store.reset_api_settings().await;
        }
        Command::TestConnection => {
            store.test_connection().await;
        }
        Command::Webhooks => {
            for w in store.webhooks().await {
                let last_test = w
                    .last_test
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("{:<12} {:<10} {} (last test: {})", w.id, w.status, w.url, last_test);
            }
        }
        Command::AddWebhook { url } => {
            let webhook = store.add_webhook(&url).await;
            println!("{}", webhook.id);
        }
        Command::RemoveWebhook { id } => {
            store.remove_webhook(&id).await;
        }
        Command::TestWebhook { id } => {
            let webhook = store.test_webhook(&id).await?;
            println!("{} {}", webhook.id, webhook.status);
        }
        Command::WebhookEvents { id } => print_json(&store.webhook_events(id.as_deref()).await)?,
        Command::Logs(filter) => {
            for entry in store.logs(&filter).await {
                println!("{}", entry);
            }
        }
        Command::ExportLogs(filter) => println!("{}", store.export_logs(&filter).await),
        Command::ClearLogs => store.clear_logs().await,
        Command::BulkPreview(campaign) => {
            campaign.validate()?;
            for p in campaign.preview(DEFAULT_PREVIEW_LIMIT) {
                println!("{} ({}): {}", p.name, p.phone, p.message);
            }
        }
        Command::BulkSend(campaign) => {
            let report = store.run_bulk(campaign).await?;
            println!("campaign {}: {}/{} sent", report.campaign_id, report.sent, report.total);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        let tokens = tokenize(r#"session create "Empresa XYZ" https://webhook.site/xyz"#).unwrap();
        assert_eq!(tokens, vec!["session", "create", "Empresa XYZ", "https://webhook.site/xyz"]);

        assert_eq!(tokenize(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert_eq!(tokenize("send 1 5511999999999 'Olá, tudo bem?'").unwrap()[3], "Olá, tudo bem?");
        assert_eq!(tokenize(r#"contact add "Ana \"Lu\" Lima" 55"#).unwrap()[2], r#"Ana "Lu" Lima"#);
        assert_eq!(tokenize(r"webhook add https://x.io/a\ b").unwrap()[2], "https://x.io/a b");
        assert!(tokenize(r#"bad "quote"#).is_err());
        assert!(tokenize("bad 'quote").is_err());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_commands() {
        assert!(parse("").unwrap().is_none());

        match parse("contact add \"Ana Lima\" 5511777777777 lead").unwrap() {
            Some(Command::AddContact(c)) => {
                assert_eq!(c.name, "Ana Lima");
                assert_eq!(c.category, ContactCategory::Lead);
            }
            other => panic!("Expected AddContact, got {:?}", other),
        }

        match parse("send 1 5511999999999 Olá tudo bem").unwrap() {
            Some(Command::Send { content, .. }) => assert_eq!(content, "Olá tudo bem"),
            other => panic!("Expected Send, got {:?}", other),
        }

        match parse("logs error autenticação").unwrap() {
            Some(Command::Logs(filter)) => {
                assert_eq!(filter.level, Some(LogLevel::Error));
                assert_eq!(filter.search.as_deref(), Some("autenticação"));
            }
            other => panic!("Expected Logs, got {:?}", other),
        }

        match parse("contacts find lead \"ana lima\"").unwrap() {
            Some(Command::FindContacts(filter)) => {
                assert_eq!(filter.category, Some(ContactCategory::Lead));
                assert_eq!(filter.search.as_deref(), Some("ana lima"));
            }
            other => panic!("Expected FindContacts, got {:?}", other),
        }
        match parse("contacts find all 5511").unwrap() {
            Some(Command::FindContacts(filter)) => {
                assert_eq!(filter.category, None);
                assert_eq!(filter.search.as_deref(), Some("5511"));
            }
            other => panic!("Expected FindContacts, got {:?}", other),
        }
        assert!(matches!(parse("session refresh 1").unwrap(), Some(Command::RefreshSession { .. })));
        assert!(matches!(parse("messages counts").unwrap(), Some(Command::MessageCounts)));

        assert!(parse("contact import A 1 B").is_err());
        assert!(parse("session status 1 online").is_err());
        assert!(parse("frobnicate").is_err());
    }
}
