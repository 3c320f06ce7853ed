use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use itertools::Itertools;

use crate::config::Config;
use crate::core::domain::{Language, UnsupportedLanguage};
use crate::core::traits::compiler::Artifact;
use crate::core::workspace::Workspace;

/// Name of the compiled artifact inside a workspace.
const NATIVE_ARTIFACT: &str = "solution";
/// Entry class assumed when a Java source declares no public class.
const JAVA_DEFAULT_CLASS: &str = "Main";
const JAVA_PUBLIC_CLASS: &str =
    r"\bpublic\s+(?:(?:final|abstract|strictfp)\s+)*class\s+([A-Za-z_$][A-Za-z0-9_$]*)";

/// Fully resolved child process invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: PathBuf,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Compiler invocation together with the artifact it must leave behind.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildPlan {
    pub command: CommandSpec,
    pub artifact: PathBuf,
}

/// How a language turns a source file into a running process.
#[derive(Clone, Debug, PartialEq)]
pub enum Toolchain {
    /// `interpreter [args..] <source>`
    Interpreter { program: PathBuf, args: Vec<String> },
    /// `compiler [flags..] <source> -o <artifact>`, then `<artifact>`
    Native { compiler: PathBuf, flags: Vec<String> },
    /// `javac -d <workspace> <Class>.java`, then `java -cp <workspace> <Class>`
    Jvm { compiler: PathBuf, runtime: PathBuf },
}

/// Name of the first public class in `code`, which javac requires to match
/// the file name.
pub fn java_public_class(code: &str) -> String {
    regex::Regex::new(JAVA_PUBLIC_CLASS)
        .ok()
        .and_then(|re| re.captures(code))
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .unwrap_or_else(|| JAVA_DEFAULT_CLASS.to_string())
}

#[derive(Clone, Debug, PartialEq)]
pub struct LanguageProfile {
    pub language: Language,
    pub extension: &'static str,
    pub toolchain: Toolchain,
    pub timeout: Duration,
}

impl LanguageProfile {
    pub fn source_file_name(&self, code: &str) -> String {
        match self.toolchain {
            Toolchain::Jvm { .. } => format!("{}{}", java_public_class(code), self.extension),
            _ => format!("{NATIVE_ARTIFACT}{}", self.extension),
        }
    }

    pub fn is_compiled(&self) -> bool {
        !matches!(self.toolchain, Toolchain::Interpreter { .. })
    }

    pub fn build_plan(&self, workspace: &Workspace) -> Option<BuildPlan> {
        let dir = workspace.dir().to_path_buf();
        let source = workspace.source_path().as_os_str().to_owned();

        match &self.toolchain {
            Toolchain::Interpreter { .. } => None,
            Toolchain::Native { compiler, flags } => {
                let artifact = dir.join(NATIVE_ARTIFACT);
                let mut args: Vec<OsString> = flags.iter().map(OsString::from).collect();
                args.push(source);
                args.push("-o".into());
                args.push(artifact.as_os_str().to_owned());
                Some(BuildPlan {
                    command: CommandSpec {
                        program: compiler.clone(),
                        args,
                        current_dir: dir,
                    },
                    artifact,
                })
            }
            Toolchain::Jvm { compiler, .. } => {
                let mut class_file = source_stem(workspace);
                class_file.push(".class");
                Some(BuildPlan {
                    command: CommandSpec {
                        program: compiler.clone(),
                        args: vec!["-d".into(), dir.as_os_str().to_owned(), source],
                        current_dir: dir.clone(),
                    },
                    artifact: dir.join(class_file),
                })
            }
        }
    }

    /// Command that runs the submission. Compiled languages run `artifact`
    /// as reported by the build step; without one they fall back to the
    /// planned location inside `workspace`.
    pub fn run_command(&self, workspace: &Workspace, artifact: Option<&Artifact>) -> CommandSpec {
        let dir = workspace.dir().to_path_buf();

        let (program, args) = match &self.toolchain {
            Toolchain::Interpreter { program, args } => {
                let mut args: Vec<OsString> = args.iter().map(OsString::from).collect();
                args.push(workspace.source_path().as_os_str().to_owned());
                (program.clone(), args)
            }
            Toolchain::Native { .. } => {
                let binary = artifact.map_or_else(|| dir.join(NATIVE_ARTIFACT), |a| a.path.clone());
                (binary, Vec::new())
            }
            Toolchain::Jvm { runtime, .. } => {
                let class_dir = artifact
                    .and_then(|a| a.path.parent())
                    .map_or_else(|| dir.as_os_str().to_owned(), |p| p.as_os_str().to_owned());
                let class = artifact
                    .and_then(|a| a.path.file_stem())
                    .map_or_else(|| source_stem(workspace), OsStr::to_os_string);
                (runtime.clone(), vec!["-cp".into(), class_dir, class])
            }
        };

        CommandSpec {
            program,
            args,
            current_dir: dir,
        }
    }
}

fn source_stem(workspace: &Workspace) -> OsString {
    workspace
        .source_path()
        .file_stem()
        .map_or_else(|| JAVA_DEFAULT_CLASS.into(), OsStr::to_os_string)
}

/// Immutable mapping from language identifiers to toolchain profiles.
#[derive(Clone, Debug)]
pub struct LanguageRegistry {
    profiles: BTreeMap<Language, LanguageProfile>,
}

impl LanguageRegistry {
    pub fn from_config(config: &Config) -> Self {
        let paths = &config.toolchains;
        let timeout = config.max_execution_time;

        let profiles = [
            (
                Language::Python,
                ".py",
                Toolchain::Interpreter {
                    program: paths.python.clone(),
                    args: Vec::new(),
                },
            ),
            (
                Language::JavaScript,
                ".js",
                Toolchain::Interpreter {
                    program: paths.node.clone(),
                    args: Vec::new(),
                },
            ),
            (
                Language::C,
                ".c",
                Toolchain::Native {
                    compiler: paths.gcc.clone(),
                    flags: vec!["-O2".into()],
                },
            ),
            (
                Language::Cpp,
                ".cpp",
                Toolchain::Native {
                    compiler: paths.gxx.clone(),
                    flags: vec!["-std=c++17".into(), "-O2".into()],
                },
            ),
            (
                Language::Java,
                ".java",
                Toolchain::Jvm {
                    compiler: paths.javac.clone(),
                    runtime: paths.java.clone(),
                },
            ),
        ]
        .into_iter()
        .map(|(language, extension, toolchain)| {
            (
                language,
                LanguageProfile {
                    language,
                    extension,
                    toolchain,
                    timeout,
                },
            )
        })
        .collect();

        Self { profiles }
    }

    pub fn with_timeout(mut self, language: Language, timeout: Duration) -> Self {
        if let Some(profile) = self.profiles.get_mut(&language) {
            profile.timeout = timeout;
        }
        self
    }

    pub fn lookup(&self, identifier: &str) -> Result<&LanguageProfile, UnsupportedLanguage> {
        let language: Language = identifier.parse()?;
        self.profiles
            .get(&language)
            .ok_or_else(|| UnsupportedLanguage(identifier.to_lowercase()))
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.profiles.keys().copied()
    }

    pub fn describe(&self) -> String {
        self.profiles
            .values()
            .map(|profile| {
                let kind = if profile.is_compiled() {
                    "compiled"
                } else {
                    "interpreted"
                };
                format!("{} ({kind})", profile.language)
            })
            .join(", ")
    }
}
