use crate::api::{ParseConfig, ParserNode, Slot, SlotKind, SpecTree};
use crate::constant::*;
use crate::dispatch::{split_selector, SelectorToken};
use crate::parser::interface::{chunk, terminal_width, UserInterface};

const PADDING_WIDTH: usize = 3;
const MAIN_INDENT: usize = 1;
const HELP_MESSAGE: &str = "Show this help message and exit.";

/// Renders the plain usage text for the node reached by a help request.
#[derive(Debug)]
pub(crate) struct Printer<'s> {
    program: String,
    selectors: Vec<String>,
    node: &'s ParserNode,
    width: usize,
}

impl<'s> Printer<'s> {
    pub(crate) fn terminal(tree: &'s SpecTree, config: &ParseConfig, path: &[String]) -> Self {
        Self::new(tree, config, path, terminal_width())
    }

    pub(crate) fn new(
        tree: &'s SpecTree,
        config: &ParseConfig,
        path: &[String],
        width: usize,
    ) -> Self {
        let mut node = tree.root();

        for selector in path {
            // Help paths are built from accepted selectors, so these always resolve.
            if let SelectorToken::Qualified {
                family,
                alternative,
            } = split_selector(selector)
            {
                if let Some(alternative) = tree
                    .find_family(family)
                    .and_then(|family| family.find(alternative))
                {
                    node = alternative.node();
                }
            }
        }

        Self {
            program: config.program().to_string(),
            selectors: path.to_vec(),
            node,
            width,
        }
    }

    pub(crate) fn print_help(&self, user_interface: &(impl UserInterface + ?Sized)) {
        for line in self.render() {
            user_interface.print(line);
        }
    }

    pub(crate) fn render(&self) -> Vec<String> {
        let mut summary = vec![self.program.clone()];
        summary.extend(self.selectors.iter().cloned());
        summary.push(format!("[-{HELP_SHORT}]"));
        let mut positionals = Vec::default();
        let mut options = vec![(format!("-{HELP_SHORT}, --{HELP_NAME}"), HELP_MESSAGE.to_string())];
        let mut subcommands = Vec::default();

        for slot in self.node.slots() {
            let grammar = grammar(slot, self.node.prefix());

            match slot.kind() {
                SlotKind::Positional => {
                    summary.push(grammar.clone());
                    positionals.push((grammar, describe(slot)));
                }
                SlotKind::Named => {
                    let flags = slot.flags();
                    let mut usage = match flags.first() {
                        Some(flag) => join(flag, &grammar),
                        None => grammar.clone(),
                    };

                    if !slot.is_required() {
                        usage = format!("[{usage}]");
                    }

                    summary.push(usage);
                    let mut left: Vec<String> = flags.iter().map(|flag| join(flag, &grammar)).collect();
                    left.extend(slot.inverse_flag());
                    options.push((left.join(", "), describe(slot)));
                }
            }
        }

        for family in self.node.families() {
            let choices = family.choices().join(",");
            summary.push(format!("{{{choices}}}"));
            let description = match family.default_name() {
                Some(default) => format!("Select one of {{{choices}}} (default: {default})."),
                None => format!("Select one of {{{choices}}}."),
            };
            subcommands.push((format!("{}{SELECTOR_DELIMITER}ALTERNATIVE", family.path()), description));
        }

        let mut out = Vec::default();
        out.extend(self.wrap("usage:", &summary.join(" ")));

        if let Some(description) = self.node.description() {
            out.push(String::default());
            out.extend(chunk(description, self.width));
        }

        for (title, rows) in [
            ("positional arguments:", positionals),
            ("options:", options),
            ("subcommands:", subcommands),
        ] {
            if !rows.is_empty() {
                out.push(String::default());
                out.push(title.to_string());
                let left_width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);

                for (left, right) in rows {
                    out.extend(self.column(left_width, &left, &right));
                }
            }
        }

        out
    }

    fn wrap(&self, head: &str, paragraph: &str) -> Vec<String> {
        let indent = head.len() + 1;
        chunk(paragraph, self.width.saturating_sub(indent))
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    format!("{head} {line}")
                } else {
                    format!("{:indent$}{line}", "")
                }
            })
            .collect()
    }

    fn column(&self, left_width: usize, left: &str, right: &str) -> Vec<String> {
        let margin = MAIN_INDENT;
        let padding = " ".repeat(PADDING_WIDTH);
        let indent = margin + left_width + PADDING_WIDTH;
        let parts = chunk(right, self.width.saturating_sub(indent));

        if parts.is_empty() {
            return vec![format!("{:margin$}{left}", "")];
        }

        parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    format!("{:margin$}{left:left_width$}{padding}{part}", "")
                } else {
                    format!("{:indent$}{part}", "")
                }
            })
            .collect()
    }
}

fn join(flag: &str, grammar: &str) -> String {
    if grammar.is_empty() {
        flag.to_string()
    } else {
        format!("{flag} {grammar}")
    }
}

// Ex: `lr` with arity 1 -> `LR`; `betas` with arity 2 -> `BETAS BETAS`; `items` with arity [1, ∞) -> `ITEMS [...]`.
fn grammar(slot: &Slot, prefix: &str) -> String {
    if slot.is_counter() || slot.is_switch() {
        return String::default();
    }

    let example = slot
        .relative_path(prefix)
        .to_ascii_uppercase()
        .replace([PATH_DELIMITER, '-'], "_");
    let arity = slot.arity();

    match arity.fixed() {
        Some(n) => vec![example; n].join(" "),
        None if arity.is_unbounded() && arity.min() == 0 => format!("[{example} ...]"),
        None if arity.is_unbounded() => {
            let mut parts = vec![example; arity.min()];
            parts.push("[...]".to_string());
            parts.join(" ")
        }
        None => format!("{example}{arity}"),
    }
}

fn describe(slot: &Slot) -> String {
    let kinds: Vec<String> = slot.variants().iter().map(|variant| variant.name()).collect();
    let mut parts = Vec::default();

    if let Some(help) = slot.help_text() {
        parts.push(help.to_string());
    }

    if !slot.is_counter() && !slot.is_switch() {
        parts.push(format!("[{}]", kinds.join(" | ")));
    }

    if let Some(default) = slot.default_value() {
        parts.push(format!("(default: {default})"));
    }

    parts.join(" ")
}
