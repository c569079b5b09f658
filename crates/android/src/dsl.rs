//! Gradle Kotlin DSL front end
//!
//! Reads the declarative subset of `build.gradle.kts` that application modules
//! use: nested blocks, `key = value` assignments, calls such as `id("...")` and
//! `implementation(platform("..."))`, and dotted references like
//! `flutter.minSdkVersion` or `JavaVersion.VERSION_17`. Anything needing Kotlin
//! evaluation (`val`, string templates, indexing) is rejected with its line.
//!
//! Blocks the resolver has no use for (`repositories`, `lint`, ...) are skipped.

use crate::error::DslError;
use crate::model::{
    normalize_java_version, BuildTypeSpec, DefaultConfig, DependencySpec, FlutterBlock, IntValue,
    ModuleSpec, PluginRef, SigningConfigSpec,
};
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Eq,
    Dot,
    Comma,
    Minus,
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// The character after the next one
    fn second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn syntax(&self, message: impl Into<String>) -> DslError {
        DslError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, DslError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let line = self.line;
            match c {
                c if c.is_whitespace() || c == ';' => {
                    self.bump();
                }
                '/' => {
                    self.bump();
                    match self.peek() {
                        Some('/') => {
                            while let Some(c) = self.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => self.block_comment(line)?,
                        _ => return Err(self.syntax("unexpected '/'")),
                    }
                }
                '"' => {
                    self.bump();
                    let text = self.string()?;
                    tokens.push((Token::Str(text), line));
                }
                c if c.is_ascii_digit() => {
                    let value = self.number()?;
                    tokens.push((Token::Int(value), line));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek() {
                        if !(c.is_alphanumeric() || c == '_') {
                            break;
                        }
                        ident.push(c);
                        self.bump();
                    }
                    tokens.push((Token::Ident(ident), line));
                }
                '`' => {
                    return Err(DslError::Unsupported {
                        line,
                        message: "backtick-quoted identifiers".to_string(),
                    })
                }
                '+' | '-' if self.second() == Some('=') => {
                    return Err(DslError::Unsupported {
                        line,
                        message: format!("compound assignment '{}='", c),
                    })
                }
                '+' => {
                    return Err(DslError::Unsupported {
                        line,
                        message: "arithmetic and string concatenation".to_string(),
                    })
                }
                _ => {
                    let token = match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '{' => Token::LBrace,
                        '}' => Token::RBrace,
                        '=' => Token::Eq,
                        '.' => Token::Dot,
                        ',' => Token::Comma,
                        '-' => Token::Minus,
                        '[' => {
                            return Err(DslError::Unsupported {
                                line,
                                message: "indexing expressions".to_string(),
                            })
                        }
                        other => return Err(self.syntax(format!("unexpected character '{}'", other))),
                    };
                    self.bump();
                    tokens.push((token, line));
                }
            }
        }

        Ok(tokens)
    }

    fn block_comment(&mut self, start: usize) -> Result<(), DslError> {
        self.bump();
        let mut previous = '\0';
        while let Some(c) = self.bump() {
            if previous == '*' && c == '/' {
                return Ok(());
            }
            previous = c;
        }
        Err(DslError::Syntax {
            line: start,
            message: "unterminated block comment".to_string(),
        })
    }

    fn string(&mut self) -> Result<String, DslError> {
        let start = self.line;
        if self.peek() == Some('"') {
            self.bump();
            if self.peek() == Some('"') {
                return Err(DslError::Unsupported {
                    line: start,
                    message: "raw string literals".to_string(),
                });
            }
            return Ok(String::new());
        }

        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(DslError::Syntax {
                        line: start,
                        message: "unterminated string literal".to_string(),
                    })
                }
                Some('"') => return Ok(text),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c @ ('"' | '\\' | '$' | '\'')) => c,
                        other => {
                            return Err(self.syntax(format!("invalid escape '\\{}'", other.unwrap_or(' '))))
                        }
                    };
                    text.push(escaped);
                }
                Some('$') => {
                    if matches!(self.peek(), Some(c) if c == '{' || c.is_alphabetic()) {
                        return Err(DslError::Unsupported {
                            line: start,
                            message: "string templates".to_string(),
                        });
                    }
                    text.push('$');
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<i64, DslError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => digits.push(c),
                '_' => {}
                _ => break,
            }
            self.bump();
        }
        if self.peek() == Some('L') {
            self.bump();
        }
        if self.peek() == Some('.') {
            let mut ahead = self.chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
                return Err(DslError::Unsupported {
                    line: self.line,
                    message: "floating point literals".to_string(),
                });
            }
        }
        digits
            .parse()
            .map_err(|_| self.syntax(format!("integer '{}' is out of range", digits)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Dotted name such as `flutter.minSdkVersion`
    Path(String),
    Call { callee: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
struct Stmt {
    line: usize,
    kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
enum StmtKind {
    Assign {
        target: String,
        value: Expr,
    },
    Invoke {
        callee: String,
        args: Vec<Expr>,
        block: Option<Vec<Stmt>>,
        /// Infix modifiers in `plugins { }`: `version "x"`, `apply false`
        infix: Vec<(String, Expr)>,
    },
}

const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "val", "var", "fun", "if", "when", "for", "import", "class", "object", "return",
];

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, line)| *line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn syntax(&self, message: impl Into<String>) -> DslError {
        DslError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), DslError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.syntax(format!("expected {}", what)))
        }
    }

    fn parse_file(&mut self) -> Result<Vec<Stmt>, DslError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, DslError> {
        let opened_at = self.line();
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(stmts);
                }
                Some(_) => stmts.push(self.statement()?),
                None => {
                    return Err(DslError::Syntax {
                        line: opened_at,
                        message: "block is never closed".to_string(),
                    })
                }
            }
        }
    }

    fn path(&mut self) -> Result<String, DslError> {
        let mut path = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => {
                self.pos -= 1;
                return Err(self.syntax("expected an identifier"));
            }
        };
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            match self.next() {
                Some(Token::Ident(name)) => {
                    path.push('.');
                    path.push_str(&name);
                }
                _ => {
                    self.pos -= 1;
                    return Err(self.syntax(format!("expected a name after '{}.'", path)));
                }
            }
        }
        Ok(path)
    }

    fn statement(&mut self) -> Result<Stmt, DslError> {
        let line = self.line();
        if let Some(Token::Ident(word)) = self.peek() {
            if UNSUPPORTED_KEYWORDS.contains(&word.as_str()) {
                return Err(DslError::Unsupported {
                    line,
                    message: format!("'{}' statements", word),
                });
            }
        }

        let target = self.path()?;
        let kind = match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                StmtKind::Assign {
                    target,
                    value: self.expr()?,
                }
            }
            Some(Token::LParen) => {
                let args = self.args()?;
                let block = if self.peek() == Some(&Token::LBrace) {
                    Some(self.block()?)
                } else {
                    None
                };
                let infix = if block.is_none() {
                    self.infix(line)?
                } else {
                    Vec::new()
                };
                StmtKind::Invoke {
                    callee: target,
                    args,
                    block,
                    infix,
                }
            }
            Some(Token::LBrace) => StmtKind::Invoke {
                callee: target,
                args: Vec::new(),
                block: Some(self.block()?),
                infix: Vec::new(),
            },
            _ => {
                return Err(self.syntax(format!(
                    "expected '=', '(' or '{{' after '{}'",
                    target
                )))
            }
        };

        Ok(Stmt { line, kind })
    }

    fn infix(&mut self, line: usize) -> Result<Vec<(String, Expr)>, DslError> {
        let mut infix = Vec::new();
        while let Some((Token::Ident(word), token_line)) = self.tokens.get(self.pos) {
            if *token_line != line || !(word == "version" || word == "apply") {
                break;
            }
            let word = word.clone();
            self.pos += 1;
            infix.push((word, self.expr()?));
        }
        Ok(infix)
    }

    fn args(&mut self) -> Result<Vec<Expr>, DslError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(args),
                _ => {
                    self.pos -= 1;
                    return Err(self.syntax("expected ',' or ')' in argument list"));
                }
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, DslError> {
        match self.peek().cloned() {
            Some(Token::Minus) => {
                self.pos += 1;
                match self.next() {
                    Some(Token::Int(n)) => Ok(Expr::Int(-n)),
                    _ => {
                        self.pos -= 1;
                        Err(self.syntax("expected a number after '-'"))
                    }
                }
            }
            Some(Token::Int(n)) => {
                self.pos += 1;
                Ok(Expr::Int(n))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Some(Token::Ident(_)) => {
                let path = self.path()?;
                match path.as_str() {
                    "true" => return Ok(Expr::Bool(true)),
                    "false" => return Ok(Expr::Bool(false)),
                    _ => {}
                }
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Path(path));
                }
                let args = self.args()?;
                if self.peek() == Some(&Token::Dot) {
                    return Err(DslError::Unsupported {
                        line: self.line(),
                        message: format!("call chains after '{}(...)'", path),
                    });
                }
                Ok(Expr::Call { callee: path, args })
            }
            _ => Err(self.syntax("expected a value")),
        }
    }
}

/// Parse a `build.gradle.kts` script into a module description
pub fn parse(source: &str) -> Result<ModuleSpec, DslError> {
    let tokens = Lexer::new(source).tokenize()?;
    let stmts = Parser::new(tokens).parse_file()?;

    let mut spec = ModuleSpec::default();
    for stmt in &stmts {
        lower_top(stmt, &mut spec)?;
    }
    Ok(spec)
}

fn unsupported(line: usize, message: impl Into<String>) -> DslError {
    DslError::Unsupported {
        line,
        message: message.into(),
    }
}

fn block_of<'a>(stmt: &'a Stmt, name: &str) -> Option<&'a [Stmt]> {
    match &stmt.kind {
        StmtKind::Invoke {
            callee,
            args,
            block: Some(body),
            ..
        } if callee == name && args.is_empty() => Some(body),
        _ => None,
    }
}

fn skip(stmt: &Stmt, scope: &str) {
    let what = match &stmt.kind {
        StmtKind::Assign { target, .. } => target,
        StmtKind::Invoke { callee, .. } => callee,
    };
    debug!(line = stmt.line, scope, what = %what, "skipping statement");
}

fn lower_top(stmt: &Stmt, spec: &mut ModuleSpec) -> Result<(), DslError> {
    if let Some(body) = block_of(stmt, "plugins") {
        for s in body {
            lower_plugin(s, spec)?;
        }
    } else if let Some(body) = block_of(stmt, "android") {
        for s in body {
            lower_android(s, spec)?;
        }
    } else if let Some(body) = block_of(stmt, "flutter") {
        let flutter = spec.flutter.get_or_insert_with(FlutterBlock::default);
        for s in body {
            match &s.kind {
                StmtKind::Assign { target, value } if target == "source" => {
                    flutter.source = Some(text_value(value, s.line)?);
                }
                _ => skip(s, "flutter"),
            }
        }
    } else if let Some(body) = block_of(stmt, "dependencies") {
        for s in body {
            lower_dependency(s, spec)?;
        }
    } else if let Some(body) = block_of(stmt, "kotlin") {
        for s in body {
            lower_kotlin(s, spec)?;
        }
    } else {
        skip(stmt, "top level");
    }
    Ok(())
}

fn lower_plugin(stmt: &Stmt, spec: &mut ModuleSpec) -> Result<(), DslError> {
    let StmtKind::Invoke {
        callee,
        args,
        block: None,
        infix,
    } = &stmt.kind
    else {
        return Err(unsupported(stmt.line, "plugins { } only accepts id(...) and kotlin(...)"));
    };

    let id = match (callee.as_str(), args.as_slice()) {
        ("id", [Expr::Str(id)]) => id.clone(),
        ("kotlin", [Expr::Str(module)]) => format!("org.jetbrains.kotlin.{}", module),
        _ => {
            return Err(unsupported(
                stmt.line,
                format!("plugin declaration '{}(...)'", callee),
            ))
        }
    };

    let mut plugin = PluginRef::new(id);
    for (word, value) in infix {
        match (word.as_str(), value) {
            ("version", Expr::Str(v)) => plugin.version = Some(v.clone()),
            ("apply", Expr::Bool(false)) => return Ok(()),
            ("apply", Expr::Bool(true)) => {}
            _ => return Err(unsupported(stmt.line, format!("plugin modifier '{}'", word))),
        }
    }
    spec.plugins.push(plugin);
    Ok(())
}

fn lower_android(stmt: &Stmt, spec: &mut ModuleSpec) -> Result<(), DslError> {
    let android = &mut spec.android;
    match &stmt.kind {
        StmtKind::Assign { target, value } => match target.as_str() {
            "namespace" => android.namespace = Some(text_value(value, stmt.line)?),
            "compileSdk" | "compileSdkVersion" => {
                android.compile_sdk = Some(int_value(value, stmt.line)?);
            }
            "ndkVersion" => android.ndk_version = Some(text_value(value, stmt.line)?),
            _ => skip(stmt, "android"),
        },
        StmtKind::Invoke {
            callee,
            args,
            block: Some(body),
            ..
        } if args.is_empty() => match callee.as_str() {
            "compileOptions" => {
                for s in body {
                    match &s.kind {
                        StmtKind::Assign { target, value } if target == "sourceCompatibility" => {
                            android.compile_options.source_compatibility =
                                Some(java_value(value, s.line)?);
                        }
                        StmtKind::Assign { target, value } if target == "targetCompatibility" => {
                            android.compile_options.target_compatibility =
                                Some(java_value(value, s.line)?);
                        }
                        _ => skip(s, "compileOptions"),
                    }
                }
            }
            "kotlinOptions" => {
                for s in body {
                    match &s.kind {
                        StmtKind::Assign { target, value } if target == "jvmTarget" => {
                            android.kotlin_options.jvm_target = Some(java_value(value, s.line)?);
                        }
                        _ => skip(s, "kotlinOptions"),
                    }
                }
            }
            "defaultConfig" => {
                for s in body {
                    lower_default_config(s, &mut android.default_config)?;
                }
            }
            "buildTypes" => {
                for s in body {
                    if let Some((name, body)) = named_block(s)? {
                        let build_type = android.build_types.entry(name).or_default();
                        for inner in body {
                            lower_build_type(inner, build_type)?;
                        }
                    } else {
                        skip(s, "buildTypes");
                    }
                }
            }
            "signingConfigs" => {
                for s in body {
                    if let Some((name, body)) = named_block(s)? {
                        let config = android.signing_configs.entry(name).or_default();
                        for inner in body {
                            lower_signing_config(inner, config)?;
                        }
                    } else {
                        skip(s, "signingConfigs");
                    }
                }
            }
            _ => skip(stmt, "android"),
        },
        StmtKind::Invoke { callee, args, block: None, .. }
            if callee == "compileSdkVersion" && args.len() == 1 =>
        {
            android.compile_sdk = Some(int_value(&args[0], stmt.line)?);
        }
        _ => skip(stmt, "android"),
    }
    Ok(())
}

fn lower_default_config(stmt: &Stmt, dc: &mut DefaultConfig) -> Result<(), DslError> {
    let (key, value) = match &stmt.kind {
        StmtKind::Assign { target, value } => (target.as_str(), value),
        StmtKind::Invoke {
            callee,
            args,
            block: None,
            ..
        } if args.len() == 1 => (callee.as_str(), &args[0]),
        _ => {
            skip(stmt, "defaultConfig");
            return Ok(());
        }
    };

    match key {
        "applicationId" => dc.application_id = Some(text_value(value, stmt.line)?),
        "minSdk" | "minSdkVersion" => dc.min_sdk = Some(int_value(value, stmt.line)?),
        "targetSdk" | "targetSdkVersion" => dc.target_sdk = Some(int_value(value, stmt.line)?),
        "versionCode" => dc.version_code = Some(int_value(value, stmt.line)?),
        "versionName" => dc.version_name = Some(text_value(value, stmt.line)?),
        "multiDexEnabled" => dc.multi_dex_enabled = Some(bool_value(value, stmt.line)?),
        _ => skip(stmt, "defaultConfig"),
    }
    Ok(())
}

/// `release { }`, `getByName("release") { }`, `create("upload") { }`
fn named_block(stmt: &Stmt) -> Result<Option<(String, &[Stmt])>, DslError> {
    let StmtKind::Invoke {
        callee,
        args,
        block: Some(body),
        ..
    } = &stmt.kind
    else {
        return Ok(None);
    };

    match (callee.as_str(), args.as_slice()) {
        (name, []) => Ok(Some((name.to_string(), body))),
        ("getByName" | "named" | "create" | "register" | "maybeCreate", [Expr::Str(name)]) => {
            Ok(Some((name.clone(), body)))
        }
        _ => Err(unsupported(
            stmt.line,
            format!("container call '{}(...)'", callee),
        )),
    }
}

fn lower_build_type(stmt: &Stmt, build_type: &mut BuildTypeSpec) -> Result<(), DslError> {
    let StmtKind::Assign { target, value } = &stmt.kind else {
        skip(stmt, "buildType");
        return Ok(());
    };

    match target.as_str() {
        "signingConfig" => build_type.signing_config = Some(signing_ref(value, stmt.line)?),
        "isMinifyEnabled" | "minifyEnabled" => {
            build_type.minify_enabled = Some(bool_value(value, stmt.line)?);
        }
        "isShrinkResources" | "shrinkResources" => {
            build_type.shrink_resources = Some(bool_value(value, stmt.line)?);
        }
        "isDebuggable" | "debuggable" => {
            build_type.debuggable = Some(bool_value(value, stmt.line)?);
        }
        _ => skip(stmt, "buildType"),
    }
    Ok(())
}

fn lower_signing_config(stmt: &Stmt, config: &mut SigningConfigSpec) -> Result<(), DslError> {
    let StmtKind::Assign { target, value } = &stmt.kind else {
        skip(stmt, "signingConfig");
        return Ok(());
    };

    match target.as_str() {
        "storeFile" => {
            config.store_file = Some(match value {
                Expr::Call { callee, args } if callee == "file" || callee == "rootProject.file" => {
                    match args.as_slice() {
                        [Expr::Str(path)] => path.clone(),
                        _ => return Err(unsupported(stmt.line, "computed keystore paths")),
                    }
                }
                other => text_value(other, stmt.line)?,
            });
        }
        "storePassword" => config.store_password = Some(text_value(value, stmt.line)?),
        "keyAlias" => config.key_alias = Some(text_value(value, stmt.line)?),
        "keyPassword" => config.key_password = Some(text_value(value, stmt.line)?),
        _ => skip(stmt, "signingConfig"),
    }
    Ok(())
}

fn lower_dependency(stmt: &Stmt, spec: &mut ModuleSpec) -> Result<(), DslError> {
    let StmtKind::Invoke {
        callee,
        args,
        block: None,
        ..
    } = &stmt.kind
    else {
        skip(stmt, "dependencies");
        return Ok(());
    };

    let (notation, platform) = match args.as_slice() {
        [Expr::Str(notation)] => (notation.clone(), false),
        [Expr::Call { callee: wrapper, args: inner }]
            if wrapper == "platform" || wrapper == "enforcedPlatform" =>
        {
            match inner.as_slice() {
                [Expr::Str(notation)] => (notation.clone(), true),
                _ => return Err(unsupported(stmt.line, format!("{}(...) argument", wrapper))),
            }
        }
        [Expr::Call { callee: wrapper, .. }] => {
            return Err(unsupported(
                stmt.line,
                format!("dependency notation '{}(...)'", wrapper),
            ))
        }
        _ => {
            return Err(unsupported(
                stmt.line,
                format!("dependency declaration '{}(...)'", callee),
            ))
        }
    };

    spec.dependencies.push(DependencySpec {
        configuration: callee.clone(),
        notation,
        platform,
    });
    Ok(())
}

fn lower_kotlin(stmt: &Stmt, spec: &mut ModuleSpec) -> Result<(), DslError> {
    let options = &mut spec.android.kotlin_options;
    if let Some(body) = block_of(stmt, "compilerOptions") {
        for s in body {
            match &s.kind {
                StmtKind::Assign { target, value } if target == "jvmTarget" => {
                    options.jvm_target = Some(java_value(value, s.line)?);
                }
                StmtKind::Invoke { callee, args, .. }
                    if callee == "jvmTarget.set" && args.len() == 1 =>
                {
                    options.jvm_target = Some(java_value(&args[0], s.line)?);
                }
                _ => skip(s, "compilerOptions"),
            }
        }
        return Ok(());
    }

    match &stmt.kind {
        StmtKind::Invoke { callee, args, .. } if callee == "jvmToolchain" && args.len() == 1 => {
            if options.jvm_target.is_none() {
                options.jvm_target = Some(java_value(&args[0], stmt.line)?);
            }
        }
        _ => skip(stmt, "kotlin"),
    }
    Ok(())
}

fn int_value(expr: &Expr, line: usize) -> Result<IntValue, DslError> {
    match expr {
        Expr::Int(n) => Ok(IntValue::Literal(*n)),
        Expr::Path(path) => Ok(IntValue::Reference(path.clone())),
        Expr::Str(s) => Ok(IntValue::Reference(s.clone())),
        _ => Err(unsupported(line, "expected an integer or a property reference")),
    }
}

fn text_value(expr: &Expr, line: usize) -> Result<String, DslError> {
    match expr {
        Expr::Str(s) | Expr::Path(s) => Ok(s.clone()),
        Expr::Int(n) => Ok(n.to_string()),
        _ => Err(unsupported(line, "expected a string or a property reference")),
    }
}

fn bool_value(expr: &Expr, line: usize) -> Result<bool, DslError> {
    match expr {
        Expr::Bool(b) => Ok(*b),
        _ => Err(unsupported(line, "expected true or false")),
    }
}

fn java_value(expr: &Expr, line: usize) -> Result<String, DslError> {
    match expr {
        Expr::Path(path) | Expr::Str(path) => Ok(normalize_java_version(path)),
        Expr::Int(n) => Ok(n.to_string()),
        Expr::Call { callee, args } if args.is_empty() && callee.ends_with(".toString") => {
            Ok(normalize_java_version(callee.trim_end_matches(".toString")))
        }
        _ => Err(unsupported(line, "expected a Java version")),
    }
}

fn signing_ref(expr: &Expr, line: usize) -> Result<String, DslError> {
    match expr {
        Expr::Call { callee, args }
            if matches!(
                callee.as_str(),
                "signingConfigs.getByName" | "signingConfigs.named" | "signingConfigs.findByName"
            ) =>
        {
            match args.as_slice() {
                [Expr::Str(name)] => Ok(name.clone()),
                _ => Err(unsupported(line, "computed signing config names")),
            }
        }
        Expr::Str(name) => Ok(name.clone()),
        _ => Err(unsupported(line, "expected signingConfigs.getByName(\"...\")")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use crate::registry::ToolchainRegistry;
    use crate::resolver::resolve;

    const FLUTTER_FIREBASE_MODULE: &str = r#"
plugins {
    id("com.android.application")
    id("kotlin-android")
    // The Flutter Gradle Plugin must be applied after the Android and Kotlin Gradle plugins.
    id("dev.flutter.flutter-gradle-plugin")
    id("com.google.gms.google-services")
}

android {
    namespace = "com.idisr.cityvape"
    compileSdk = 36

    ndkVersion = flutter.ndkVersion

    compileOptions {
        sourceCompatibility = JavaVersion.VERSION_17
        targetCompatibility = JavaVersion.VERSION_17
    }

    kotlinOptions {
        jvmTarget = JavaVersion.VERSION_17.toString()
    }

    defaultConfig {
        applicationId = "com.idisr.cityvape"
        // الحد الأدنى للتشغيل
        minSdk = flutter.minSdkVersion
        targetSdk = 36
        versionCode = flutter.versionCode
        versionName = flutter.versionName
        multiDexEnabled = true
    }

    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("debug")
            isMinifyEnabled = false
            isShrinkResources = false
        }
    }
}

flutter {
    source = "../.."
}

dependencies {
    implementation("androidx.multidex:multidex:2.0.1")
    /* Firebase BoM */
    implementation(platform("com.google.firebase:firebase-bom:34.8.0"))
    implementation("com.google.firebase:firebase-analytics")
    implementation("com.google.firebase:firebase-auth")
    implementation("com.google.firebase:firebase-firestore")
}
"#;

    #[test]
    fn test_parse_flutter_module() {
        let spec = parse(FLUTTER_FIREBASE_MODULE).unwrap();

        let ids: Vec<_> = spec.plugins.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "com.android.application",
                "kotlin-android",
                "dev.flutter.flutter-gradle-plugin",
                "com.google.gms.google-services",
            ]
        );
        assert_eq!(spec.android.namespace.as_deref(), Some("com.idisr.cityvape"));
        assert_eq!(spec.android.compile_sdk, Some(IntValue::Literal(36)));
        assert_eq!(spec.android.ndk_version.as_deref(), Some("flutter.ndkVersion"));
        assert_eq!(
            spec.android.compile_options.source_compatibility.as_deref(),
            Some("17")
        );
        assert_eq!(spec.android.kotlin_options.jvm_target.as_deref(), Some("17"));
        assert_eq!(
            spec.android.default_config.min_sdk,
            Some(IntValue::Reference("flutter.minSdkVersion".to_string()))
        );
        assert_eq!(spec.android.default_config.multi_dex_enabled, Some(true));
        let release = &spec.android.build_types["release"];
        assert_eq!(release.signing_config.as_deref(), Some("debug"));
        assert_eq!(release.shrink_resources, Some(false));
        assert_eq!(
            spec.flutter.as_ref().and_then(|f| f.source.as_deref()),
            Some("../..")
        );
        assert_eq!(spec.dependencies.len(), 5);
        assert!(spec.dependencies[1].platform);
        assert_eq!(spec.dependencies[4].configuration, "implementation");
    }

    #[test]
    fn test_parsed_module_resolves() {
        let spec = parse(FLUTTER_FIREBASE_MODULE).unwrap();
        let plan = resolve(&spec, &ToolchainRegistry::builtin()).unwrap();

        assert_eq!(plan.build_config.min_sdk, 21);
        assert_eq!(plan.build_config.target_sdk, 36);
        assert_eq!(plan.build_config.compile_sdk, 36);
        assert_eq!(plan.variants["release"].signing_config, "debug");
        let firebase: Vec<_> = plan
            .dependencies
            .iter()
            .filter(|d| d.coordinate.group == "com.google.firebase" && !d.platform)
            .collect();
        assert_eq!(firebase.len(), 3);
        for dep in firebase {
            assert_eq!(dep.version, None, "{} has an invented version", dep.notation());
        }
    }

    #[test]
    fn test_release_signing_reference_fails_resolution() {
        let source = FLUTTER_FIREBASE_MODULE
            .replace("getByName(\"debug\")", "getByName(\"release\")");
        let spec = parse(&source).unwrap();
        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert!(err.has(ViolationKind::UnresolvedSigningReference));
    }

    #[test]
    fn test_signing_configs_and_named_build_types() {
        let spec = parse(
            r#"
            android {
                signingConfigs {
                    create("upload") {
                        storeFile = file("keys/upload.jks")
                        storePassword = "pw"
                        keyAlias = "upload"
                        keyPassword = "pw"
                    }
                }
                buildTypes {
                    getByName("release") {
                        signingConfig = signingConfigs.getByName("upload")
                        isMinifyEnabled = true
                        proguardFiles(getDefaultProguardFile("proguard-android-optimize.txt"), "proguard-rules.pro")
                    }
                }
            }
            "#,
        )
        .unwrap();

        let upload = &spec.android.signing_configs["upload"];
        assert_eq!(upload.store_file.as_deref(), Some("keys/upload.jks"));
        assert_eq!(upload.key_alias.as_deref(), Some("upload"));
        let release = &spec.android.build_types["release"];
        assert_eq!(release.signing_config.as_deref(), Some("upload"));
        assert_eq!(release.minify_enabled, Some(true));
    }

    #[test]
    fn test_plugin_modifiers_and_kotlin_block() {
        let spec = parse(
            r#"
            plugins {
                id("com.android.application") version "8.7.0"
                kotlin("android")
                id("com.google.gms.google-services") version "4.4.2" apply false
            }
            kotlin {
                compilerOptions {
                    jvmTarget.set(JvmTarget.JVM_21)
                }
            }
            "#,
        )
        .unwrap();

        assert_eq!(spec.plugins.len(), 2);
        assert_eq!(spec.plugins[0].version.as_deref(), Some("8.7.0"));
        assert_eq!(spec.plugins[1].id, "org.jetbrains.kotlin.android");
        assert_eq!(spec.android.kotlin_options.jvm_target.as_deref(), Some("21"));
    }

    #[test]
    fn test_negative_literal() {
        let spec = parse("android { defaultConfig { minSdk = -1 } }").unwrap();
        assert_eq!(spec.android.default_config.min_sdk, Some(IntValue::Literal(-1)));
    }

    #[test]
    fn test_unclosed_block_reports_opening_line() {
        let err = parse("plugins {\n    id(\"a\")\n\nandroid {\n").unwrap_err();
        assert!(matches!(err, DslError::Syntax { line: 4, .. }), "{:?}", err);
    }

    #[test]
    fn test_val_is_unsupported() {
        let err = parse("\n\nval props = Properties()\n").unwrap_err();
        assert_eq!(
            err,
            DslError::Unsupported {
                line: 3,
                message: "'val' statements".to_string()
            }
        );
    }

    #[test]
    fn test_string_template_is_unsupported() {
        let err = parse("android {\n  namespace = \"com.${name}\"\n}").unwrap_err();
        assert!(matches!(err, DslError::Unsupported { line: 2, .. }));
    }

    #[test]
    fn test_project_dependency_is_unsupported() {
        let err = parse("dependencies {\n  implementation(project(\":core\"))\n}").unwrap_err();
        assert!(matches!(err, DslError::Unsupported { line: 2, .. }));
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("android {\n  namespace = \"com.example\n}").unwrap_err();
        assert!(matches!(err, DslError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_unknown_blocks_are_skipped() {
        let spec = parse("repositories { google() }\nandroid { lint { abortOnError = false } }")
            .unwrap();
        assert_eq!(spec, ModuleSpec::default());
    }

    #[test]
    fn test_compound_assignment_is_unsupported() {
        let err = parse(
            r#"
            android {
                packaging { resources { excludes += "x" } }
            }
            "#,
        )
        .unwrap_err();
        assert!(
            matches!(&err, DslError::Unsupported { line: 3, message } if message.contains("+=")),
            "{:?}",
            err
        );

        let err = parse("android {\n  lint { disable -= \"x\" }\n}").unwrap_err();
        assert!(matches!(err, DslError::Unsupported { line: 2, .. }), "{:?}", err);
    }

    #[test]
    fn test_concatenation_is_unsupported() {
        let err = parse("android {\n  namespace = \"com.\" + \"example\"\n}").unwrap_err();
        assert!(matches!(err, DslError::Unsupported { line: 2, .. }), "{:?}", err);
    }

    #[test]
    fn test_negative_literal_still_parses() {
        let spec = parse("android {\n  compileSdk = -1\n}").unwrap();
        assert_eq!(spec.android.compile_sdk, Some(IntValue::Literal(-1)));
    }
}
