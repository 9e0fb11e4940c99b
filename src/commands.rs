/// Shell commands, parsing and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "add",
    aliases: &["a", "new"],
    usage: "add <task>",
    description: "Record a new todo",
  },
  Command {
    name: "toggle",
    aliases: &["t", "done"],
    usage: "toggle <n|id>",
    description: "Flip completion of a todo",
  },
  Command {
    name: "delete",
    aliases: &["d", "rm"],
    usage: "delete <n|id>",
    description: "Remove a todo",
  },
  Command {
    name: "list",
    aliases: &["l", "ls"],
    usage: "list",
    description: "Show the current list",
  },
  Command {
    name: "sync",
    aliases: &["s"],
    usage: "sync",
    description: "Deliver pending actions now",
  },
  Command {
    name: "pending",
    aliases: &["p", "queue"],
    usage: "pending",
    description: "Show actions awaiting the server",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this help",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit todoq",
  },
];

/// Which todo a command refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  /// 1-based position in the last rendered list
  Index(usize),
  Id(String),
}

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
  Add(String),
  Toggle(Target),
  Delete(Target),
  List,
  Sync,
  Pending,
  Help,
  Quit,
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve a typed command word: exact name or alias, or an unambiguous prefix.
fn resolve(word: &str) -> Result<&'static Command, String> {
  let lower = word.to_lowercase();
  let suggestions = get_suggestions(&lower);
  match suggestions.as_slice() {
    [] => Err(format!("Unknown command '{}'. Type 'help'.", word)),
    [only] => Ok(*only),
    [first, ..] if first.name == lower || first.aliases.contains(&lower.as_str()) => Ok(*first),
    several => Err(format!(
      "Ambiguous command '{}': {}",
      word,
      several.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    )),
  }
}

fn parse_target(arg: &str, usage: &str) -> Result<Target, String> {
  if arg.is_empty() {
    return Err(format!("Usage: {}", usage));
  }
  match arg.parse::<usize>() {
    Ok(0) => Err("Positions start at 1".to_string()),
    Ok(n) => Ok(Target::Index(n)),
    Err(_) => Ok(Target::Id(arg.to_string())),
  }
}

/// Parse one shell line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Result<ShellCommand, String>> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  let (word, rest) = match line.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (line, ""),
  };

  let parsed = resolve(word).and_then(|cmd| match cmd.name {
    "add" if rest.is_empty() => Err(format!("Usage: {}", cmd.usage)),
    "add" => Ok(ShellCommand::Add(rest.to_string())),
    "toggle" => parse_target(rest, cmd.usage).map(ShellCommand::Toggle),
    "delete" => parse_target(rest, cmd.usage).map(ShellCommand::Delete),
    "list" => Ok(ShellCommand::List),
    "sync" => Ok(ShellCommand::Sync),
    "pending" => Ok(ShellCommand::Pending),
    "help" => Ok(ShellCommand::Help),
    _ => Ok(ShellCommand::Quit),
  });

  Some(parsed)
}

/// Help text listing every command.
pub fn help() -> String {
  COMMANDS
    .iter()
    .map(|c| format!("  {:<16} {}", c.usage, c.description))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("sync");
    assert_eq!(suggestions[0].name, "sync");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("rm");
    assert_eq!(suggestions[0].name, "delete");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("tog");
    assert_eq!(suggestions[0].name, "toggle");
  }

  #[test]
  fn test_parse_add_keeps_whole_task() {
    assert_eq!(
      parse("add  buy milk and eggs "),
      Some(Ok(ShellCommand::Add("buy milk and eggs".to_string())))
    );
    assert!(matches!(parse("add"), Some(Err(_))));
  }

  #[test]
  fn test_parse_targets() {
    assert_eq!(
      parse("t 2"),
      Some(Ok(ShellCommand::Toggle(Target::Index(2))))
    );
    assert_eq!(
      parse("delete 01HZX3"),
      Some(Ok(ShellCommand::Delete(Target::Id("01HZX3".to_string()))))
    );
    assert!(matches!(parse("toggle 0"), Some(Err(_))));
    assert!(matches!(parse("toggle"), Some(Err(_))));
  }

  #[test]
  fn test_parse_resolution() {
    // "d" is delete's alias and a prefix of toggle's "done"
    assert_eq!(
      parse("d 1"),
      Some(Ok(ShellCommand::Delete(Target::Index(1))))
    );
    assert_eq!(parse("p"), Some(Ok(ShellCommand::Pending)));
    assert!(matches!(parse("frobnicate"), Some(Err(_))));
    assert_eq!(parse("   "), None);
    assert_eq!(parse("QUIT"), Some(Ok(ShellCommand::Quit)));
  }
}
