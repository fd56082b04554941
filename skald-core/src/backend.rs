//! Output backends and per-backend code fragments.
//!
//! Every piece of generated code is a [`Code`]: one fragment per
//! enabled backend. Writes aimed at a disabled backend are dropped.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    Go,
    Js,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Go, Backend::Js];

    const fn index(self) -> usize {
        match self {
            Backend::Go => 0,
            Backend::Js => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Go => "go",
            Backend::Js => "js",
        }
    }

    /// File extension of generated programs.
    pub fn extension(self) -> &'static str {
        self.name()
    }

    /// Chooses between the Go and JavaScript spelling of something.
    pub fn pick<T>(self, go: T, js: T) -> T {
        match self {
            Backend::Go => go,
            Backend::Js => js,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "go" => Ok(Backend::Go),
            "js" | "javascript" => Ok(Backend::Js),
            other => Err(CoreError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// The set of backends a compile emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    enabled: [bool; 2],
}

impl Default for Targets {
    fn default() -> Self {
        Self::only(Backend::Go)
    }
}

impl Targets {
    pub fn none() -> Self {
        Self { enabled: [false; 2] }
    }

    pub fn only(backend: Backend) -> Self {
        Self::none().with(backend)
    }

    pub fn all() -> Self {
        Self { enabled: [true; 2] }
    }

    pub fn with(mut self, backend: Backend) -> Self {
        self.enabled[backend.index()] = true;
        self
    }

    pub fn enabled(self, backend: Backend) -> bool {
        self.enabled[backend.index()]
    }

    pub fn is_empty(self) -> bool {
        !self.enabled.iter().any(|on| *on)
    }

    pub fn iter(self) -> impl Iterator<Item = Backend> {
        Backend::ALL.into_iter().filter(move |b| self.enabled(*b))
    }
}

impl FromIterator<Backend> for Targets {
    fn from_iter<I: IntoIterator<Item = Backend>>(iter: I) -> Self {
        iter.into_iter().fold(Targets::none(), Targets::with)
    }
}

/// Generated text, one fragment per enabled backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    fragments: [Option<String>; 2],
}

impl Code {
    /// Empty fragments for every enabled backend.
    pub fn empty(targets: Targets) -> Self {
        Self::render(targets, |_| String::new())
    }

    pub fn render(targets: Targets, mut f: impl FnMut(Backend) -> String) -> Self {
        let mut code = Code::default();
        for backend in targets.iter() {
            code.fragments[backend.index()] = Some(f(backend));
        }
        code
    }

    /// The same text for every enabled backend.
    pub fn text(targets: Targets, text: &str) -> Self {
        Self::render(targets, |_| text.to_string())
    }

    pub fn targets(&self) -> Targets {
        Backend::ALL
            .into_iter()
            .filter(|b| self.fragments[b.index()].is_some())
            .collect()
    }

    pub fn get(&self, backend: Backend) -> Option<&str> {
        self.fragments[backend.index()].as_deref()
    }

    /// The fragment for `backend`, or `""` when it is disabled.
    pub fn as_str(&self, backend: Backend) -> &str {
        self.get(backend).unwrap_or_default()
    }

    pub fn push_str(&mut self, backend: Backend, text: &str) {
        if let Some(fragment) = self.fragments[backend.index()].as_mut() {
            fragment.push_str(text);
        }
    }

    /// Appends `text` to every enabled fragment.
    pub fn push_all(&mut self, text: &str) {
        for fragment in self.fragments.iter_mut().flatten() {
            fragment.push_str(text);
        }
    }

    pub fn append(&mut self, other: &Code) {
        for backend in Backend::ALL {
            if let Some(text) = other.get(backend) {
                self.push_str(backend, text);
            }
        }
    }

    pub fn map(&self, mut f: impl FnMut(Backend, &str) -> String) -> Code {
        Code::render(self.targets(), |backend| f(backend, self.as_str(backend)))
    }

    pub fn zip(&self, other: &Code, mut f: impl FnMut(Backend, &str, &str) -> String) -> Code {
        Code::render(self.targets(), |backend| {
            f(backend, self.as_str(backend), other.as_str(backend))
        })
    }

    /// Joins fragments per backend with `separator`.
    pub fn join<'c>(targets: Targets, parts: impl IntoIterator<Item = &'c Code>, separator: &str) -> Code {
        let mut joined = Code::empty(targets);
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                joined.push_all(separator);
            }
            joined.append(part);
        }
        joined
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().flatten().all(String::is_empty)
    }
}

/// Runtime support functions emitted into the Neck region the first
/// time generated code needs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Helper {
    Wrap,
    At,
    Same,
    Div,
    Mod,
    Pow,
    StringAt,
    Atoi,
    Atof,
    ReadUntil,
}

impl Helper {
    /// The name generated code calls the helper by.
    pub fn name(self) -> &'static str {
        match self {
            Helper::Wrap => "skald_wrap",
            Helper::At => "skald_at",
            Helper::Same => "skald_same",
            Helper::Div => "skald_div",
            Helper::Mod => "skald_mod",
            Helper::Pow => "skald_pow",
            Helper::StringAt => "skald_string_at",
            Helper::Atoi => "skald_atoi",
            Helper::Atof => "skald_atof",
            Helper::ReadUntil => "skald_in",
        }
    }

    /// Helpers that must be emitted before this one.
    pub fn requires(self) -> &'static [Helper] {
        match self {
            Helper::StringAt | Helper::At => &[Helper::Wrap],
            _ => &[],
        }
    }

    /// Packages the helper imports on `backend`.
    pub fn imports(self, backend: Backend) -> &'static [&'static str] {
        match (self, backend) {
            (Helper::Atoi | Helper::Atof, Backend::Go) => &["strconv"],
            (Helper::ReadUntil, Backend::Go) => &["bufio", "os"],
            _ => &[],
        }
    }

    /// Source of the helper, or `None` when `backend` cannot express it.
    pub fn source(self, backend: Backend) -> Option<&'static str> {
        match (self, backend) {
            (Helper::Wrap, Backend::Go) => Some(
                "func skald_wrap(i, n int) int {\n\tif n == 0 {\n\t\treturn 0\n\t}\n\ti %= n\n\tif i < 0 {\n\t\ti += n\n\t}\n\treturn i\n}\n\n",
            ),
            (Helper::Wrap, Backend::Js) => Some(
                "function skald_wrap(i, n) {\n\tif (n === 0) {\n\t\treturn 0;\n\t}\n\treturn ((i % n) + n) % n;\n}\n\n",
            ),
            (Helper::At, Backend::Go) => Some(
                "func skald_at[T any](xs []T, i int, zero T) T {\n\tif len(xs) == 0 {\n\t\treturn zero\n\t}\n\treturn xs[skald_wrap(i, len(xs))]\n}\n\n",
            ),
            (Helper::At, Backend::Js) => Some(
                "function skald_at(xs, i, zero) {\n\tif (xs.length === 0) {\n\t\treturn zero;\n\t}\n\treturn xs[skald_wrap(i, xs.length)];\n}\n\n",
            ),
            // Go compares structs with `==`.
            (Helper::Same, Backend::Go) => None,
            (Helper::Same, Backend::Js) => Some(
                "function skald_same(a, b) {\n\tfor (const k of Object.keys(a)) {\n\t\tconst same = typeof a[k] === \"object\" ? skald_same(a[k], b[k]) : a[k] === b[k];\n\t\tif (!same) {\n\t\t\treturn false;\n\t\t}\n\t}\n\treturn true;\n}\n\n",
            ),
            (Helper::Div, Backend::Go) => Some(
                "func skald_div(a, b int) int {\n\tif b == 0 {\n\t\tif a == 0 {\n\t\t\treturn 1\n\t\t}\n\t\treturn 0\n\t}\n\treturn a / b\n}\n\n",
            ),
            (Helper::Div, Backend::Js) => Some(
                "function skald_div(a, b) {\n\tif (b === 0) {\n\t\treturn a === 0 ? 1 : 0;\n\t}\n\treturn Math.trunc(a / b);\n}\n\n",
            ),
            (Helper::Mod, Backend::Go) => Some(
                "func skald_mod(a, b int) int {\n\tif b == 0 {\n\t\treturn 0\n\t}\n\treturn a % b\n}\n\n",
            ),
            (Helper::Mod, Backend::Js) => Some(
                "function skald_mod(a, b) {\n\tif (b === 0) {\n\t\treturn 0;\n\t}\n\treturn a % b;\n}\n\n",
            ),
            (Helper::Pow, Backend::Go) => Some(
                "func skald_pow(a, b int) int {\n\tif b < 0 {\n\t\treturn 0\n\t}\n\tr := 1\n\tfor ; b > 0; b-- {\n\t\tr *= a\n\t}\n\treturn r\n}\n\n",
            ),
            (Helper::Pow, Backend::Js) => Some(
                "function skald_pow(a, b) {\n\tif (b < 0) {\n\t\treturn 0;\n\t}\n\treturn a ** b;\n}\n\n",
            ),
            (Helper::StringAt, Backend::Go) => Some(
                "func skald_string_at(s string, i int) rune {\n\tr := []rune(s)\n\tif len(r) == 0 {\n\t\treturn 0\n\t}\n\treturn r[skald_wrap(i, len(r))]\n}\n\n",
            ),
            (Helper::StringAt, Backend::Js) => Some(
                "function skald_string_at(s, i) {\n\tconst r = [...s];\n\tif (r.length === 0) {\n\t\treturn \"\";\n\t}\n\treturn r[skald_wrap(i, r.length)];\n}\n\n",
            ),
            (Helper::Atoi, Backend::Go) => Some(
                "func skald_atoi(s string) int {\n\tn, err := strconv.Atoi(s)\n\tif err != nil {\n\t\treturn 0\n\t}\n\treturn n\n}\n\n",
            ),
            (Helper::Atoi, Backend::Js) => Some(
                "function skald_atoi(s) {\n\tconst n = parseInt(s, 10);\n\treturn Number.isNaN(n) ? 0 : n;\n}\n\n",
            ),
            (Helper::Atof, Backend::Go) => Some(
                "func skald_atof(s string) float64 {\n\tn, err := strconv.ParseFloat(s, 64)\n\tif err != nil {\n\t\treturn 0\n\t}\n\treturn n\n}\n\n",
            ),
            (Helper::Atof, Backend::Js) => Some(
                "function skald_atof(s) {\n\tconst n = parseFloat(s);\n\treturn Number.isNaN(n) ? 0 : n;\n}\n\n",
            ),
            (Helper::ReadUntil, Backend::Go) => Some(
                "var skald_stdin = bufio.NewReader(os.Stdin)\n\nfunc skald_in(delim rune) string {\n\tvar out []rune\n\tfor {\n\t\tr, _, err := skald_stdin.ReadRune()\n\t\tif err != nil || r == delim {\n\t\t\treturn string(out)\n\t\t}\n\t\tout = append(out, r)\n\t}\n}\n\n",
            ),
            (Helper::ReadUntil, Backend::Js) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backends_swallow_writes() {
        let mut code = Code::text(Targets::only(Backend::Js), "a");
        code.push_all("b");
        code.push_str(Backend::Go, "ignored");
        assert_eq!(code.get(Backend::Js), Some("ab"));
        assert_eq!(code.get(Backend::Go), None);
        assert_eq!(code.as_str(Backend::Go), "");
    }

    #[test]
    fn zip_renders_each_backend() {
        let targets = Targets::all();
        let lhs = Code::text(targets, "x");
        let rhs = Code::text(targets, "y");
        let eq = lhs.zip(&rhs, |b, l, r| format!("({l} {} {r})", b.pick("==", "===")));
        assert_eq!(eq.as_str(Backend::Go), "(x == y)");
        assert_eq!(eq.as_str(Backend::Js), "(x === y)");
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!("go".parse::<Backend>().unwrap(), Backend::Go);
        assert_eq!("JS".parse::<Backend>().unwrap(), Backend::Js);
        assert!("wasm".parse::<Backend>().is_err());
    }
}
