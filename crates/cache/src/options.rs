//! Recognized compiler options and argument redirection
//!
//! The cache only needs to understand a handful of javac flags: the ones
//! naming directories the compiler writes to, and the source path. Each is
//! described by a [`CompilerOption`] so the "value is the next token"
//! assumption lives in one table instead of in index arithmetic at every
//! call site.

/// A compiler flag the cache knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOption {
    /// Every spelling of the flag; the first one is used when inserting it
    pub names: &'static [&'static str],
    /// Whether the flag consumes exactly one following token as its value
    pub takes_value: bool,
}

impl CompilerOption {
    /// `true` if `token` is one of this option's spellings
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        self.names.contains(&token)
    }

    /// Canonical spelling
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.names[0]
    }
}

/// `--source-path <path>` / `-sourcepath <path>`
pub const SOURCE_PATH: CompilerOption = CompilerOption {
    names: &["--source-path", "-sourcepath"],
    takes_value: true,
};

/// `-d <directory>`: where class files are written
pub const DESTINATION: CompilerOption = CompilerOption {
    names: &["-d"],
    takes_value: true,
};

/// `-h <directory>`: where native headers are written
pub const HEADERS: CompilerOption = CompilerOption {
    names: &["-h"],
    takes_value: true,
};

/// `-s <directory>`: where generated sources are written
pub const GENERATED: CompilerOption = CompilerOption {
    names: &["-s"],
    takes_value: true,
};

/// All options the cache inspects
pub const KNOWN_OPTIONS: &[CompilerOption] = &[SOURCE_PATH, DESTINATION, HEADERS, GENERATED];

/// Position of the first token spelling `option`
#[must_use]
pub fn option_index(args: &[String], option: &CompilerOption) -> Option<usize> {
    args.iter().position(|arg| option.matches(arg))
}

/// Value following the first occurrence of `option`.
///
/// `None` when the option is absent, takes no value, or is the last token.
#[must_use]
pub fn value_of<'a>(args: &'a [String], option: &CompilerOption) -> Option<&'a str> {
    if !option.takes_value {
        return None;
    }
    let idx = option_index(args, option)?;
    args.get(idx + 1).map(String::as_str)
}

/// Point `option` at `new_value`.
///
/// If the option is present its value token is replaced. If it is absent and
/// `add_if_absent` is set, `[option, new_value]` is prepended; otherwise the
/// arguments come back unchanged. Options that take no value are never
/// rewritten.
#[must_use]
pub fn redirect(
    args: &[String],
    option: &CompilerOption,
    new_value: &str,
    add_if_absent: bool,
) -> Vec<String> {
    if !option.takes_value {
        return args.to_vec();
    }

    match option_index(args, option) {
        Some(idx) => {
            let mut out = args.to_vec();
            match out.get_mut(idx + 1) {
                Some(value) => new_value.clone_into(value),
                None => out.push(new_value.to_string()),
            }
            out
        }
        None if add_if_absent => {
            let mut out = Vec::with_capacity(args.len() + 2);
            out.push(option.name().to_string());
            out.push(new_value.to_string());
            out.extend_from_slice(args);
            out
        }
        None => args.to_vec(),
    }
}
