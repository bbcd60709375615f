//! Args：收集参数，并把含 `$` 引用语法的 format 编译成最终 SQL。
//!
//! format 语法：
//! - `$n`：引用第 n 个参数（0 起）。同一参数可以被引用多次，每次都会展开。
//! - `$?`：引用“上一个被引用参数”的下一个参数。
//! - `$$`：输出字面量 `$`。

use crate::flavor::{Flavor, default_flavor};
use crate::modifiers::{Arg, Raw};

/// 参数收集器（参数 sink）。
#[derive(Debug, Clone)]
pub struct Args {
    /// 默认 flavor，用于 `compile`。
    pub flavor: Flavor,
    pub(crate) arg_values: Vec<Arg>,
}

impl Default for Args {
    fn default() -> Self {
        Self::with_flavor(default_flavor())
    }
}

impl Args {
    pub fn with_flavor(flavor: Flavor) -> Self {
        Self {
            flavor,
            arg_values: Vec::new(),
        }
    }

    /// Add：追加一个参数并返回它在 format 中的引用（`$0/$1/...`）。
    pub fn add(&mut self, arg: impl Into<Arg>) -> String {
        let idx = self.arg_values.len();
        self.arg_values.push(arg.into());
        format!("${idx}")
    }

    pub fn len(&self) -> usize {
        self.arg_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arg_values.is_empty()
    }

    /// Compile：按默认 flavor 编译 format。
    pub fn compile(&self, format: &str, initial_value: &[Arg]) -> (String, Vec<Arg>) {
        self.compile_with_flavor(format, self.flavor, initial_value)
    }

    /// CompileWithFlavor：编译 format，并用 `flavor` 输出最终占位符。
    ///
    /// `initial_value` 是外层已收集的参数，返回的参数列表以它们开头。
    pub fn compile_with_flavor(
        &self,
        format: &str,
        flavor: Flavor,
        initial_value: &[Arg],
    ) -> (String, Vec<Arg>) {
        let mut offset = 0usize;
        let mut ctx = CompileContext {
            buf: String::new(),
            flavor,
            values: initial_value.to_vec(),
        };

        let mut rest = format;
        while let Some(pos) = rest.find('$') {
            if pos > 0 {
                ctx.buf.push_str(&rest[..pos]);
            }
            rest = &rest[pos + 1..];

            let Some(&b0) = rest.as_bytes().first() else {
                ctx.buf.push('$');
                break;
            };
            match b0 {
                b'$' => {
                    ctx.buf.push('$');
                    rest = &rest[1..];
                }
                b'0'..=b'9' => {
                    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
                    let pointer = rest[..digits].parse::<usize>().unwrap_or(usize::MAX);
                    rest = &rest[digits..];
                    offset = self.compile_successive(&mut ctx, pointer);
                }
                b'?' => {
                    rest = &rest[1..];
                    offset = self.compile_successive(&mut ctx, offset);
                }
                _ => ctx.buf.push('$'),
            }
        }

        if !rest.is_empty() {
            ctx.buf.push_str(rest);
        }

        (ctx.buf, ctx.values)
    }

    fn compile_successive(&self, ctx: &mut CompileContext, offset: usize) -> usize {
        match self.arg_values.get(offset) {
            Some(arg) => {
                ctx.write_value(arg);
                offset + 1
            }
            None => {
                ctx.buf.push_str("/* INVALID ARG $");
                ctx.buf.push_str(&offset.to_string());
                ctx.buf.push_str(" */");
                offset
            }
        }
    }
}

#[derive(Debug)]
struct CompileContext {
    buf: String,
    flavor: Flavor,
    values: Vec<Arg>,
}

impl CompileContext {
    fn write_value(&mut self, arg: &Arg) {
        match arg {
            Arg::Builder(b) => {
                let (sql, args) = b.build_with_flavor(self.flavor, &self.values);
                self.buf.push_str(&sql);
                self.values = args;
            }
            Arg::Raw(Raw { expr }) => self.buf.push_str(expr),
            Arg::List { args, is_tuple } => {
                if *is_tuple {
                    self.buf.push('(');
                }
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str(", ");
                    }
                    self.write_value(a);
                }
                if *is_tuple {
                    self.buf.push(')');
                }
            }
            Arg::Value(_) => {
                self.flavor
                    .write_placeholder(self.values.len() + 1, &mut self.buf);
                self.values.push(arg.clone());
            }
        }
    }
}
