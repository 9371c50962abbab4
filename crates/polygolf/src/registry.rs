//! Registry of target languages.

use crate::traits::Language;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Global language registry.
static LANGUAGES: RwLock<Vec<&'static dyn Language>> = RwLock::new(Vec::new());
static LANGUAGES_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom language. Later registrations do not shadow earlier
/// ones with the same name.
pub fn register_language(language: &'static dyn Language) {
    init_languages();
    LANGUAGES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(language);
}

fn init_languages() {
    LANGUAGES_INITIALIZED.get_or_init(|| {
        let mut languages = LANGUAGES.write().unwrap_or_else(PoisonError::into_inner);
        #[cfg(feature = "target-lua")]
        {
            languages.push(&crate::output::lua::LUA_LANGUAGE);
        }
        #[cfg(feature = "target-csharp")]
        {
            languages.push(&crate::output::csharp::CSHARP_LANGUAGE);
        }
        #[cfg(feature = "target-nim")]
        {
            languages.push(&crate::output::nim::NIM_LANGUAGE);
        }
        #[cfg(feature = "target-debug")]
        {
            languages.push(&crate::output::debug::DEBUG_LANGUAGE);
        }
        drop(languages);
    });
}

/// Get a language by name.
pub fn language_for_name(name: &str) -> Option<&'static dyn Language> {
    init_languages();
    LANGUAGES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .find(|l| l.name() == name)
        .copied()
}

/// Get all registered languages.
pub fn languages() -> Vec<&'static dyn Language> {
    init_languages();
    LANGUAGES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::ir::Program;
    use crate::target::Target;
    use crate::traits::Emitter;

    #[test]
    #[cfg(feature = "target-lua")]
    fn test_lua_lookup() {
        let lua = language_for_name("lua").expect("lua language");
        assert_eq!(lua.name(), "lua");
        assert_eq!(lua.extension(), "lua");
        assert_eq!(lua.target().name, "lua");
    }

    #[test]
    #[cfg(feature = "target-csharp")]
    fn test_csharp_lookup() {
        let csharp = language_for_name("csharp").expect("csharp language");
        assert_eq!(csharp.extension(), "cs");
        let target = csharp.target();
        assert!(target.dependency_map.is_some());
    }

    #[test]
    #[cfg(feature = "target-nim")]
    fn test_nim_lookup() {
        let nim = language_for_name("nim").expect("nim language");
        assert_eq!(nim.extension(), "nim");
        let target = nim.target();
        assert_eq!(target.golf_plugins.len(), 1);
        let dependencies = target.dependency_map.expect("nim imports modules");
        assert_eq!(dependencies.get("paramStr").map(String::as_str), Some("os"));
        assert_eq!(dependencies.get("exp").map(String::as_str), Some("math"));
    }

    #[test]
    fn test_unknown_language() {
        assert!(language_for_name("brainfuck").is_none());
    }

    struct Silent;

    impl Emitter for Silent {
        fn emit(&self, _program: &Program) -> Result<String, CompileError> {
            Ok(String::new())
        }
    }

    struct Echo;

    impl Language for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn extension(&self) -> &'static str {
            "echo"
        }

        fn target(&self) -> Target {
            Target::new("echo", Silent)
        }
    }

    static ECHO: Echo = Echo;

    #[test]
    fn test_register_custom_language() {
        register_language(&ECHO);
        let echo = language_for_name("echo").expect("registered language");
        assert_eq!(echo.name(), "echo");
        assert!(languages().iter().any(|l| l.name() == "echo"));
    }
}
