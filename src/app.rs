use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CachePolicy, SqliteCacheStorage};
use crate::commands::{self, ShellCommand, Target};
use crate::config::Config;
use crate::connectivity::{self, Connectivity, ConnectivityTracker};
use crate::event::{Event, EventHandler};
use crate::http::{Fetch, ReqwestFetcher};
use crate::queue::{ActionQueue, SqliteActionStore, SyncReport};
use crate::todos::client::HttpTodoClient;
use crate::todos::types::{Action, Todo};

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Raw network fetcher, bypassing the cache (used by the connectivity probe)
  network: Arc<dyn Fetch>,

  /// Action queue driving the remote service
  queue: ActionQueue,

  /// Last rendered list, for positional targets in the shell
  shown: Vec<Todo>,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let db_path = config.db_path()?;
    let network = ReqwestFetcher::new(config.timeout())?;

    let fetcher: Arc<dyn Fetch> = if config.cache.enabled {
      let storage = SqliteCacheStorage::open(&db_path)?;
      let policy = CachePolicy::new(storage, network.clone(), config.cache.version.clone());
      if let Err(e) = policy.prepare(&config.static_asset_urls()?).await {
        warn!(generation = %policy.version(), "cache install failed: {}", e);
      }
      Arc::new(policy)
    } else {
      Arc::new(network.clone())
    };

    let client = HttpTodoClient::new(fetcher, &config.api.url);
    let store = SqliteActionStore::open(&db_path)?;
    let queue = ActionQueue::new(store, Arc::new(client));

    info!(api = %config.api.url, db = %db_path.display(), "app initialized");

    Ok(Self {
      config,
      network: Arc::new(network),
      queue,
      shown: Vec::new(),
    })
  }

  /// Record one action, run the sync it triggers, and report.
  pub async fn record(&mut self, action: Action) -> Result<()> {
    self.queue.start().await?;

    let kind = action.kind();
    let id = action.id().to_string();
    let report = self
      .queue
      .dispatch(action)
      .await
      .map_err(|e| eyre!("Sync task failed: {}", e))??;

    println!("{} {}: {}", kind, id, describe(&report));
    Ok(())
  }

  pub async fn list(&mut self) -> Result<()> {
    self.queue.start().await?;
    self.refresh().await;
    Ok(())
  }

  pub async fn sync(&mut self) -> Result<()> {
    let report = self.queue.start().await?;
    println!("{}", describe(&report));
    Ok(())
  }

  pub fn pending(&self) -> Result<()> {
    self.queue.load()?;
    println!("{}", render_pending(&self.queue.pending()));
    Ok(())
  }

  /// Interactive loop: shell input, connectivity changes and sync completions.
  pub async fn run_shell(&mut self) -> Result<()> {
    let mut events = EventHandler::new();
    events.forward_sync(self.queue.subscribe());
    events.read_stdin();
    connectivity::spawn_probe(
      Arc::clone(&self.network),
      format!("{}/todos", self.config.api.url.trim_end_matches('/')),
      self.config.probe_interval(),
      events.sender(),
    );

    let mut tracker = ConnectivityTracker::new();

    println!("todoq - type 'help' for commands");
    self.queue.start().await?;

    while let Some(event) = events.next().await {
      match event {
        Event::Input(line) => match commands::parse(&line) {
          None => {}
          Some(Err(message)) => println!("{}", message),
          Some(Ok(command)) => {
            if !self.execute(command).await? {
              break;
            }
          }
        },
        Event::InputClosed => break,
        Event::Connectivity(status) => {
          match status {
            Connectivity::Offline => println!("[offline] changes will be kept until reconnect"),
            Connectivity::Online => println!("[online]"),
          }
          resync_on_reconnect(&self.queue, &mut tracker, status).await?;
        }
        Event::SyncComplete(report) => {
          if report.remaining > 0 {
            println!("{}", describe(&report));
          }
          self.refresh().await;
        }
      }
    }

    Ok(())
  }

  /// Run one shell command. Returns `false` on quit.
  async fn execute(&mut self, command: ShellCommand) -> Result<bool> {
    match command {
      ShellCommand::Add(task) => {
        self.queue.dispatch(Action::add(task));
      }
      ShellCommand::Toggle(target) => match resolve_target(&self.shown, &target) {
        Ok(id) => {
          self.queue.dispatch(Action::Toggle { id });
        }
        Err(message) => println!("{}", message),
      },
      ShellCommand::Delete(target) => match resolve_target(&self.shown, &target) {
        Ok(id) => {
          self.queue.dispatch(Action::Delete { id });
        }
        Err(message) => println!("{}", message),
      },
      ShellCommand::List => self.refresh().await,
      ShellCommand::Sync => {
        self.queue.sync().await?;
      }
      ShellCommand::Pending => println!("{}", render_pending(&self.queue.pending())),
      ShellCommand::Help => println!("{}", commands::help()),
      ShellCommand::Quit => return Ok(false),
    }
    Ok(true)
  }

  /// Re-derive and print the list.
  async fn refresh(&mut self) {
    match self.queue.derive().await {
      Ok(todos) => {
        println!("{}", render(&todos));
        self.shown = todos;
      }
      Err(e) => {
        warn!("derive failed: {}", e);
        println!(
          "List unavailable ({} pending): {}",
          self.queue.pending().len(),
          e
        );
      }
    }
  }
}

/// Run a sync pass when the connection comes back after an outage.
async fn resync_on_reconnect(
  queue: &ActionQueue,
  tracker: &mut ConnectivityTracker,
  status: Connectivity,
) -> Result<Option<SyncReport>> {
  if !tracker.observe(status) {
    return Ok(None);
  }
  info!("back online, resyncing");
  queue.sync().await.map(Some)
}

fn describe(report: &SyncReport) -> String {
  if report.is_settled() {
    format!("synced ({} delivered)", report.acknowledged)
  } else {
    format!(
      "{} delivered, {} pending",
      report.acknowledged, report.remaining
    )
  }
}

/// Numbered checklist of todos.
pub fn render(todos: &[Todo]) -> String {
  if todos.is_empty() {
    return "(no todos)".to_string();
  }

  todos
    .iter()
    .enumerate()
    .map(|(i, todo)| {
      format!(
        "{:>3}. [{}] {}  ({})",
        i + 1,
        if todo.completed { "x" } else { " " },
        todo.task,
        todo.id
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn render_pending(actions: &[Action]) -> String {
  if actions.is_empty() {
    return "(nothing pending)".to_string();
  }

  actions
    .iter()
    .map(|action| match action {
      Action::Add { id, task, .. } => format!("  add    {} {:?}", id, task),
      other => format!("  {:<6} {}", other.kind(), other.id()),
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Turn a shell target into a todo id.
///
/// Positions refer to the last rendered list. Ids may be abbreviated to any
/// prefix that matches exactly one shown todo; anything else is used verbatim.
fn resolve_target(shown: &[Todo], target: &Target) -> std::result::Result<String, String> {
  match target {
    Target::Index(n) => n
      .checked_sub(1)
      .and_then(|i| shown.get(i))
      .map(|todo| todo.id.clone())
      .ok_or_else(|| format!("No todo at position {}", n)),
    Target::Id(id) => {
      let mut matches = shown.iter().filter(|todo| todo.id.starts_with(id.as_str()));
      match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only.id.clone()),
        (Some(_), Some(_)) => Err(format!("Ambiguous id prefix '{}'", id)),
        (None, _) => Ok(id.clone()),
      }
    }
  }
}
