//! `alias` and `unalias`: manage command aliases.
//!
//! `alias` with no arguments lists all definitions. Definitions accept
//! `NAME=VALUE`; since the tokenizer splits `ll='ls -l'` into the `ll=`
//! word followed by a quoted word, a definition whose value is empty
//! adopts the following argument. Matched surrounding quotes in the value
//! are stripped.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct AliasCommand;

impl Builtin for AliasCommand {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn synopsis(&self) -> &'static str {
        "Define or display aliases"
    }

    fn usage(&self) -> &'static str {
        "alias [NAME[=VALUE]...]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        if args.len() == 1 {
            for (name, value) in ctx.aliases.list() {
                println!("alias {name}='{value}'");
            }
            return Ok(0);
        }

        let mut status = 0;
        let mut i = 1;
        while i < args.len() {
            let arg = &args[i];
            match arg.split_once('=') {
                Some((name, value)) => {
                    let value = if value.is_empty() && i + 1 < args.len() {
                        i += 1;
                        args[i].clone()
                    } else {
                        value.to_string()
                    };
                    let value = strip_quotes(&value);
                    if let Err(e) = ctx.aliases.set(name, value) {
                        eprintln!("alias: {e}");
                        status = 1;
                    }
                }
                None => match ctx.aliases.get(arg) {
                    Some(value) => println!("alias {arg}='{value}'"),
                    None => {
                        eprintln!("alias: {arg}: not found");
                        status = 1;
                    }
                },
            }
            i += 1;
        }
        Ok(status)
    }
}

pub struct UnaliasCommand;

impl Builtin for UnaliasCommand {
    fn name(&self) -> &'static str {
        "unalias"
    }

    fn synopsis(&self) -> &'static str {
        "Remove aliases"
    }

    fn usage(&self) -> &'static str {
        "unalias NAME..."
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        let mut status = 0;
        for name in &args[1..] {
            if !ctx.aliases.unset(name) {
                eprintln!("unalias: {name}: not found");
                status = 1;
            }
        }
        Ok(status)
    }
}

/// Remove one matched pair of surrounding quotes, if present.
fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
