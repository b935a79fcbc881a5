/* Copyright 2025 The NeoShell Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */


//! Implementation of the `help` verb.

use clap::{Command, CommandFactory};
use neoshell_codec::fields::split_fields;
use neoshell_codec::timeformat::{DEFAULT_LAYOUT, SYMBOLIC_LAYOUTS};

use crate::dispatcher::{ActionContext, VERBS, Verb, VerbKind, find_verb};
use crate::error::Result;
use crate::verbs::{chart, desc, explain, export, import, key, show, sql, walk};

const HELP_TIME_ZONE: &str = "  tz
    Local          time zone of the operating system
    UTC            coordinated universal time
    <IANA name>    a zone of the tz database, e.g. Europe/Copenhagen or Asia/Seoul";

const HELP_CUSTOM_LAYOUT: &str = "    custom layout
      year           2006
      month          01
      day            02
      hour           03 or 15
      minute         04
      second         05 or with sub-seconds '05.999999'";

pub fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let fields = split_fields(arguments, true);

    let text = match fields.first().map(|topic| topic.to_lowercase()).as_deref() {
        Some("timeformat") => help_time_format(),
        Some("tz") => HELP_TIME_ZONE.to_owned(),
        Some(name) => match find_verb(name) {
            Some(verb) => help_verb(verb),
            None => help_verbs(),
        },
        None => help_verbs(),
    };

    context.console.println(&text)
}

/// List every verb sorted by name with `help` last and `exit` appended.
fn help_verbs() -> String {
    let mut verbs: Vec<&Verb> = VERBS
        .iter()
        .filter(|verb| verb.kind != VerbKind::Exit)
        .collect();
    verbs.sort_by_key(|verb| (verb.kind == VerbKind::Help, verb.name));

    let exit = VERBS.iter().filter(|verb| verb.kind == VerbKind::Exit);

    let mut lines = vec!["commands".to_owned()];
    lines.extend(
        verbs
            .into_iter()
            .chain(exit)
            .map(|verb| format!("    {:<10} {}", verb.name, verb.description)),
    );

    lines.join("\n")
}

fn help_verb(verb: &Verb) -> String {
    let command = match verb.kind {
        VerbKind::Sql => Some(sql::SqlOptions::command()),
        VerbKind::Explain => Some(explain::ExplainOptions::command()),
        VerbKind::Export => Some(export::ExportOptions::command()),
        VerbKind::Import => Some(import::ImportOptions::command()),
        VerbKind::Desc => Some(desc::DescOptions::command()),
        VerbKind::Show => Some(show::ShowOptions::command()),
        VerbKind::Walk => Some(walk::WalkOptions::command()),
        VerbKind::Chart => Some(chart::ChartOptions::command()),
        VerbKind::Key => Some(key::KeyOptions::command()),
        VerbKind::Set => None,
        VerbKind::Shutdown => None,
        VerbKind::Help => None,
        VerbKind::Exit => None,
    };

    match command {
        Some(mut command) => render_help(&mut command),
        None => {
            let usage = match verb.kind {
                VerbKind::Set => "set [<key> <value>]",
                VerbKind::Help => "help [<verb>|timeformat|tz]",
                _ => verb.name,
            };
            format!("{}\n\nUsage: {usage}", verb.description)
        }
    }
}

fn render_help(command: &mut Command) -> String {
    command.render_help().to_string().trim_end().to_owned()
}

fn help_time_format() -> String {
    let mut lines = vec![
        "  timeformat".to_owned(),
        "    epoch".to_owned(),
        "      ns             nanoseconds".to_owned(),
        "      us             microseconds".to_owned(),
        "      ms             milliseconds".to_owned(),
        "      s              seconds".to_owned(),
        "    abbreviations".to_owned(),
    ];

    lines.extend(SYMBOLIC_LAYOUTS.iter().map(|(name, layout)| {
        let name = if *layout == DEFAULT_LAYOUT {
            format!("{name},-")
        } else {
            (*name).to_owned()
        };
        format!("      {name:<14} {layout}")
    }));

    lines.push(HELP_CUSTOM_LAYOUT.to_owned());
    lines.join("\n")
}
