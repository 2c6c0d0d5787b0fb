//! The module registry
//!
//! Built once at compiler startup and immutable thereafter: every importable
//! module, each exported function's runtime symbol, parameter types, arity
//! and effect tag. Name resolution binds `module.attr` references against
//! this table and codegen emits direct calls to the listed symbols — there
//! is no dynamic dispatch left at runtime.

use crate::types::{HandleKind, Type};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Effect tag for a shim, used by the optimizer (pure calls with unused
/// results are removable) and as documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Pure,
    Io,
    Mutates,
}

#[derive(Debug, Clone)]
pub struct ShimFn {
    pub name: &'static str,
    /// C symbol in pycc-runtime.
    pub symbol: &'static str,
    pub params: Vec<Type>,
    /// Number of required leading arguments; the rest default to None.
    pub min_args: usize,
    pub ret: Type,
    pub effect: Effect,
}

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    pub funcs: Vec<ShimFn>,
}

impl ModuleDescriptor {
    pub fn find(&self, name: &str) -> Option<&ShimFn> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

pub struct ModuleRegistry {
    modules: HashMap<&'static str, ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn global() -> &'static ModuleRegistry {
        static REGISTRY: OnceLock<ModuleRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ModuleRegistry::build)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn is_module(&self, name: &str) -> bool {
        self.modules.contains_key(name) || name == "__future__"
    }

    /// Every shim symbol with its parameter count, for emitting runtime
    /// declarations.
    pub fn all_shims(&self) -> Vec<&ShimFn> {
        let mut out: Vec<&ShimFn> = self.modules.values().flat_map(|m| m.funcs.iter()).collect();
        out.sort_by_key(|f| f.symbol);
        out.dedup_by_key(|f| f.symbol);
        out
    }

    fn build() -> ModuleRegistry {
        fn f(
            name: &'static str,
            symbol: &'static str,
            params: Vec<Type>,
            ret: Type,
            effect: Effect,
        ) -> ShimFn {
            let min_args = params.len();
            ShimFn { name, symbol, params, min_args, ret, effect }
        }

        fn f_opt(
            name: &'static str,
            symbol: &'static str,
            params: Vec<Type>,
            min_args: usize,
            ret: Type,
            effect: Effect,
        ) -> ShimFn {
            ShimFn { name, symbol, params, min_args, ret, effect }
        }

        use Effect::{Io, Mutates, Pure};
        use Type::{Any, Bool, Bytes, Float, Int, NoneType, Str};

        let list_any = || Type::list_of(Any);
        let list_str = || Type::list_of(Str);
        let list_int = || Type::list_of(Int);
        let list_float = || Type::list_of(Float);

        // The path functions are shared by os.path, posixpath and pathlib.
        let path_funcs = || {
            vec![
                f("join", "pycc_path_join", vec![Str, Str], Str, Pure),
                f("dirname", "pycc_path_dirname", vec![Str], Str, Pure),
                f("basename", "pycc_path_basename", vec![Str], Str, Pure),
                f("splitext", "pycc_path_splitext", vec![Str], list_str(), Pure),
                f("suffix", "pycc_path_suffix", vec![Str], Str, Pure),
                f("abspath", "pycc_path_abspath", vec![Str], Str, Io),
                f("home", "pycc_path_home", vec![], Str, Io),
                f("exists", "pycc_path_exists", vec![Str], Bool, Io),
            ]
        };

        let modules = vec![
            ModuleDescriptor {
                name: "io",
                funcs: vec![
                    f("write_stdout", "pycc_io_write_stdout", vec![Str], NoneType, Io),
                    f("write_file", "pycc_io_write_file", vec![Str, Str], Bool, Io),
                    f("read_file", "pycc_io_read_file", vec![Str], Str, Io),
                ],
            },
            ModuleDescriptor {
                name: "os",
                funcs: {
                    let mut funcs = vec![
                        f("mkdir", "pycc_os_mkdir", vec![Str], NoneType, Io),
                        f("remove", "pycc_os_remove", vec![Str], NoneType, Io),
                        f("getcwd", "pycc_os_getcwd", vec![], Str, Io),
                        f("getenv", "pycc_os_getenv", vec![Str], Str, Io),
                    ];
                    funcs.extend(path_funcs());
                    funcs
                },
            },
            ModuleDescriptor { name: "os.path", funcs: path_funcs() },
            ModuleDescriptor { name: "posixpath", funcs: path_funcs() },
            ModuleDescriptor { name: "pathlib", funcs: path_funcs() },
            ModuleDescriptor {
                name: "pprint",
                funcs: vec![
                    f("pformat", "pycc_pprint_pformat", vec![Any], Str, Pure),
                    f("pprint", "pycc_pprint_pprint", vec![Any], NoneType, Io),
                ],
            },
            ModuleDescriptor {
                name: "reprlib",
                funcs: vec![f("repr", "pycc_reprlib_repr", vec![Any], Str, Pure)],
            },
            ModuleDescriptor {
                name: "json",
                funcs: vec![
                    f("dumps", "pycc_json_dumps", vec![Any], Str, Pure),
                    f("loads", "pycc_json_loads", vec![Str], Any, Pure),
                ],
            },
            ModuleDescriptor {
                name: "re",
                funcs: vec![
                    f(
                        "search",
                        "pycc_re_search",
                        vec![Str, Str],
                        Type::optional(Type::Handle(HandleKind::Match)),
                        Pure,
                    ),
                    f(
                        "match",
                        "pycc_re_match",
                        vec![Str, Str],
                        Type::optional(Type::Handle(HandleKind::Match)),
                        Pure,
                    ),
                    f("sub", "pycc_re_sub", vec![Str, Str, Str], Str, Pure),
                ],
            },
            ModuleDescriptor {
                name: "hashlib",
                funcs: vec![
                    f("sha256", "pycc_hashlib_sha256", vec![Any], Str, Pure),
                    f("md5", "pycc_hashlib_md5", vec![Any], Str, Pure),
                ],
            },
            ModuleDescriptor {
                name: "hmac",
                funcs: vec![f("digest", "pycc_hmac_digest", vec![Any, Any, Str], Bytes, Pure)],
            },
            ModuleDescriptor {
                name: "base64",
                funcs: vec![
                    f("b64encode", "pycc_base64_b64encode", vec![Any], Bytes, Pure),
                    f("b64decode", "pycc_base64_b64decode", vec![Any], Bytes, Pure),
                ],
            },
            ModuleDescriptor {
                name: "binascii",
                funcs: vec![
                    f("hexlify", "pycc_binascii_hexlify", vec![Any], Bytes, Pure),
                    f("unhexlify", "pycc_binascii_unhexlify", vec![Any], Bytes, Pure),
                ],
            },
            ModuleDescriptor {
                name: "bisect",
                funcs: vec![
                    f("bisect_left", "pycc_bisect_bisect_left", vec![list_any(), Any], Int, Pure),
                    f("bisect_right", "pycc_bisect_bisect_right", vec![list_any(), Any], Int, Pure),
                    f("bisect", "pycc_bisect_bisect_right", vec![list_any(), Any], Int, Pure),
                    f("insort", "pycc_bisect_insort", vec![list_any(), Any], NoneType, Mutates),
                    f("insort_left", "pycc_bisect_insort_left", vec![list_any(), Any], NoneType, Mutates),
                ],
            },
            ModuleDescriptor {
                name: "heapq",
                funcs: vec![
                    f("heappush", "pycc_heapq_heappush", vec![list_any(), Any], NoneType, Mutates),
                    f("heappop", "pycc_heapq_heappop", vec![list_any()], Any, Mutates),
                    f("heapify", "pycc_heapq_heapify", vec![list_any()], NoneType, Mutates),
                ],
            },
            ModuleDescriptor {
                name: "itertools",
                funcs: vec![
                    f(
                        "combinations",
                        "pycc_itertools_combinations",
                        vec![list_any(), Int],
                        Type::list_of(Type::list_of(Any)),
                        Pure,
                    ),
                    f(
                        "permutations",
                        "pycc_itertools_permutations",
                        vec![list_any(), Int],
                        Type::list_of(Type::list_of(Any)),
                        Pure,
                    ),
                ],
            },
            ModuleDescriptor {
                name: "collections",
                funcs: vec![
                    f("Counter", "pycc_collections_counter", vec![list_any()], Type::dict_of(Any, Int), Pure),
                    f("OrderedDict", "pycc_collections_ordereddict", vec![list_any()], Type::dict_of(Any, Any), Pure),
                    f(
                        "defaultdict",
                        "pycc_collections_defaultdict",
                        vec![Any],
                        Type::Handle(HandleKind::DefaultDict),
                        Pure,
                    ),
                    f(
                        "defaultdict_get",
                        "pycc_collections_defaultdict_get",
                        vec![Type::Handle(HandleKind::DefaultDict), Any],
                        Any,
                        Pure,
                    ),
                    f(
                        "defaultdict_set",
                        "pycc_collections_defaultdict_set",
                        vec![Type::Handle(HandleKind::DefaultDict), Any, Any],
                        NoneType,
                        Mutates,
                    ),
                ],
            },
            ModuleDescriptor {
                name: "struct",
                funcs: vec![
                    f("pack", "pycc_struct_pack", vec![Str, list_any()], Bytes, Pure),
                    f("unpack", "pycc_struct_unpack", vec![Str, Bytes], list_int(), Pure),
                    f("calcsize", "pycc_struct_calcsize", vec![Str], Int, Pure),
                ],
            },
            ModuleDescriptor {
                name: "datetime",
                funcs: vec![
                    f("now", "pycc_datetime_now", vec![], Str, Io),
                    f("utcnow", "pycc_datetime_utcnow", vec![], Str, Io),
                    f("fromtimestamp", "pycc_datetime_fromtimestamp", vec![Any], Str, Pure),
                    f("utcfromtimestamp", "pycc_datetime_utcfromtimestamp", vec![Any], Str, Pure),
                ],
            },
            ModuleDescriptor {
                name: "time",
                funcs: vec![
                    f("time", "pycc_time_time", vec![], Float, Io),
                    f("time_ns", "pycc_time_time_ns", vec![], Int, Io),
                    f("monotonic", "pycc_time_monotonic", vec![], Float, Io),
                    f("perf_counter", "pycc_time_perf_counter", vec![], Float, Io),
                    f("sleep", "pycc_time_sleep", vec![Any], NoneType, Io),
                ],
            },
            ModuleDescriptor {
                name: "random",
                funcs: vec![
                    f("seed", "pycc_random_seed", vec![Int], NoneType, Mutates),
                    f("random", "pycc_random_random", vec![], Float, Mutates),
                    f("randint", "pycc_random_randint", vec![Int, Int], Int, Mutates),
                    f("randrange", "pycc_random_randrange", vec![Int], Int, Mutates),
                    f("getrandbits", "pycc_random_getrandbits", vec![Int], Int, Mutates),
                ],
            },
            ModuleDescriptor {
                name: "secrets",
                funcs: vec![
                    f("token_bytes", "pycc_secrets_token_bytes", vec![Int], Bytes, Io),
                    f("token_hex", "pycc_secrets_token_hex", vec![Int], Str, Io),
                    f("token_urlsafe", "pycc_secrets_token_urlsafe", vec![Int], Str, Io),
                ],
            },
            ModuleDescriptor {
                name: "uuid",
                funcs: vec![f("uuid4", "pycc_uuid_uuid4", vec![], Str, Io)],
            },
            ModuleDescriptor {
                name: "stat",
                funcs: vec![
                    f("S_ISDIR", "pycc_stat_s_isdir", vec![Int], Bool, Pure),
                    f("S_ISREG", "pycc_stat_s_isreg", vec![Int], Bool, Pure),
                ],
            },
            ModuleDescriptor {
                name: "textwrap",
                funcs: vec![
                    f("fill", "pycc_textwrap_fill", vec![Str, Int], Str, Pure),
                    f("wrap", "pycc_textwrap_wrap", vec![Str, Int], list_str(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "_abc",
                funcs: vec![
                    f("register", "pycc_abc_register", vec![Str, Str], Bool, Mutates),
                    f("is_registered", "pycc_abc_is_registered", vec![Str, Str], Bool, Pure),
                    f("get_cache_token", "pycc_abc_get_cache_token", vec![], Int, Pure),
                    f("invalidate_cache", "pycc_abc_invalidate_cache", vec![], NoneType, Mutates),
                    f("reset", "pycc_abc_reset", vec![], NoneType, Mutates),
                ],
            },
            ModuleDescriptor {
                name: "argparse",
                funcs: vec![
                    f(
                        "ArgumentParser",
                        "pycc_argparse_argumentparser",
                        vec![],
                        Type::Handle(HandleKind::ArgParser),
                        Pure,
                    ),
                    f(
                        "add_argument",
                        "pycc_argparse_add_argument",
                        vec![Type::Handle(HandleKind::ArgParser), Str, Str],
                        NoneType,
                        Mutates,
                    ),
                    f(
                        "parse_args",
                        "pycc_argparse_parse_args",
                        vec![Type::Handle(HandleKind::ArgParser), list_str()],
                        Type::dict_of(Str, Any),
                        Pure,
                    ),
                ],
            },
            ModuleDescriptor {
                name: "copy",
                funcs: vec![
                    f("copy", "pycc_copy_copy", vec![Any], Any, Pure),
                    f("deepcopy", "pycc_copy_deepcopy", vec![Any], Any, Pure),
                ],
            },
            ModuleDescriptor {
                name: "sys",
                funcs: vec![
                    f("platform", "pycc_sys_platform", vec![], Str, Pure),
                    f("version", "pycc_sys_version", vec![], Str, Pure),
                    f("maxsize", "pycc_sys_maxsize", vec![], Int, Pure),
                    f("argv", "pycc_sys_argv", vec![], list_str(), Io),
                    f("exit", "pycc_sys_exit", vec![Int], NoneType, Io),
                ],
            },
            ModuleDescriptor {
                name: "calendar",
                funcs: vec![
                    f("isleap", "pycc_calendar_isleap", vec![Int], Bool, Pure),
                    f("monthrange", "pycc_calendar_monthrange", vec![Int, Int], list_int(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "statistics",
                funcs: vec![
                    f("mean", "pycc_statistics_mean", vec![list_any()], Float, Pure),
                    f("median", "pycc_statistics_median", vec![list_any()], Float, Pure),
                    f("stdev", "pycc_statistics_stdev", vec![list_any()], Float, Pure),
                    f("pstdev", "pycc_statistics_pstdev", vec![list_any()], Float, Pure),
                    f("variance", "pycc_statistics_variance", vec![list_any()], Float, Pure),
                    f("pvariance", "pycc_statistics_pvariance", vec![list_any()], Float, Pure),
                ],
            },
            ModuleDescriptor {
                name: "shlex",
                funcs: vec![
                    f("split", "pycc_shlex_split", vec![Str], list_str(), Pure),
                    f("join", "pycc_shlex_join", vec![list_str()], Str, Pure),
                ],
            },
            ModuleDescriptor {
                name: "shutil",
                funcs: vec![
                    f("copyfile", "pycc_shutil_copyfile", vec![Str, Str], Bool, Io),
                    f("copy", "pycc_shutil_copy", vec![Str, Str], Bool, Io),
                ],
            },
            ModuleDescriptor {
                name: "tempfile",
                funcs: vec![
                    f("gettempdir", "pycc_tempfile_gettempdir", vec![], Str, Io),
                    f("mkdtemp", "pycc_tempfile_mkdtemp", vec![], Str, Io),
                    f("mkstemp", "pycc_tempfile_mkstemp", vec![], list_any(), Io),
                ],
            },
            ModuleDescriptor {
                name: "glob",
                funcs: vec![f("glob", "pycc_glob_glob", vec![Str], list_str(), Io)],
            },
            ModuleDescriptor {
                name: "fnmatch",
                funcs: vec![
                    f("fnmatch", "pycc_fnmatch_fnmatch", vec![Str, Str], Bool, Pure),
                    f("fnmatchcase", "pycc_fnmatch_fnmatchcase", vec![Str, Str], Bool, Pure),
                    f("filter", "pycc_fnmatch_filter", vec![list_str(), Str], list_str(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "html",
                funcs: vec![
                    f_opt("escape", "pycc_html_escape", vec![Str, Any], 1, Str, Pure),
                    f("unescape", "pycc_html_unescape", vec![Str], Str, Pure),
                ],
            },
            ModuleDescriptor {
                name: "keyword",
                funcs: vec![
                    f("iskeyword", "pycc_keyword_iskeyword", vec![Str], Bool, Pure),
                    f("kwlist", "pycc_keyword_kwlist", vec![], list_str(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "platform",
                funcs: vec![
                    f("system", "pycc_platform_system", vec![], Str, Io),
                    f("machine", "pycc_platform_machine", vec![], Str, Io),
                    f("release", "pycc_platform_release", vec![], Str, Io),
                    f("version", "pycc_platform_version", vec![], Str, Io),
                ],
            },
            ModuleDescriptor {
                name: "unicodedata",
                funcs: vec![f("normalize", "pycc_unicodedata_normalize", vec![Str, Str], Str, Pure)],
            },
            ModuleDescriptor {
                name: "types",
                funcs: vec![f_opt(
                    "SimpleNamespace",
                    "pycc_types_simplenamespace",
                    vec![list_any()],
                    0,
                    Type::Handle(HandleKind::Namespace),
                    Pure,
                )],
            },
            ModuleDescriptor {
                name: "array",
                funcs: vec![
                    f("array", "pycc_array_array", vec![Str, list_any()], Type::Handle(HandleKind::Array), Pure),
                    f("append", "pycc_array_append", vec![Type::Handle(HandleKind::Array), Int], NoneType, Mutates),
                    f("pop", "pycc_array_pop", vec![Type::Handle(HandleKind::Array)], Int, Mutates),
                    f("tolist", "pycc_array_tolist", vec![Type::Handle(HandleKind::Array)], list_int(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "errno",
                funcs: vec![
                    f("EPERM", "pycc_errno_eperm", vec![], Int, Pure),
                    f("ENOENT", "pycc_errno_enoent", vec![], Int, Pure),
                    f("EEXIST", "pycc_errno_eexist", vec![], Int, Pure),
                    f("EISDIR", "pycc_errno_eisdir", vec![], Int, Pure),
                    f("ENOTDIR", "pycc_errno_enotdir", vec![], Int, Pure),
                    f("EACCES", "pycc_errno_eacces", vec![], Int, Pure),
                ],
            },
            ModuleDescriptor {
                name: "colorsys",
                funcs: vec![
                    f("rgb_to_hsv", "pycc_colorsys_rgb_to_hsv", vec![Any, Any, Any], list_float(), Pure),
                    f("hsv_to_rgb", "pycc_colorsys_hsv_to_rgb", vec![Any, Any, Any], list_float(), Pure),
                ],
            },
            ModuleDescriptor {
                name: "getpass",
                funcs: vec![
                    f("getuser", "pycc_getpass_getuser", vec![], Str, Io),
                    f_opt("getpass", "pycc_getpass_getpass", vec![Any], 0, Str, Io),
                ],
            },
        ];

        ModuleRegistry { modules: modules.into_iter().map(|m| (m.name, m)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_the_demo_imports() {
        let reg = ModuleRegistry::global();
        for name in [
            "io", "os", "os.path", "posixpath", "pathlib", "pprint", "reprlib", "json", "re",
            "hashlib", "hmac", "base64", "binascii", "bisect", "heapq", "itertools",
            "collections", "struct", "datetime", "time", "random", "secrets", "uuid", "stat",
            "textwrap", "_abc", "argparse", "copy", "sys", "calendar", "statistics", "shlex",
            "shutil", "tempfile", "glob", "fnmatch", "html", "keyword", "platform",
            "unicodedata", "types", "array", "errno", "colorsys", "getpass",
        ] {
            assert!(reg.module(name).is_some(), "missing module {}", name);
        }
        assert!(reg.is_module("__future__"));
    }

    #[test]
    fn lookup_binds_symbols() {
        let reg = ModuleRegistry::global();
        let pformat = reg.module("pprint").unwrap().find("pformat").unwrap();
        assert_eq!(pformat.symbol, "pycc_pprint_pformat");
        assert_eq!(pformat.params.len(), 1);
        assert_eq!(pformat.ret, Type::Str);

        // bisect and bisect_right share one shim.
        let m = reg.module("bisect").unwrap();
        assert_eq!(m.find("bisect").unwrap().symbol, m.find("bisect_right").unwrap().symbol);
    }

    #[test]
    fn optional_arguments() {
        let reg = ModuleRegistry::global();
        let escape = reg.module("html").unwrap().find("escape").unwrap();
        assert_eq!(escape.min_args, 1);
        assert_eq!(escape.params.len(), 2);
        let ns = reg.module("types").unwrap().find("SimpleNamespace").unwrap();
        assert_eq!(ns.min_args, 0);
    }

    #[test]
    fn shim_symbols_are_unique_per_signature() {
        let reg = ModuleRegistry::global();
        let shims = reg.all_shims();
        let mut symbols: Vec<&str> = shims.iter().map(|s| s.symbol).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), shims.len());
    }

    #[test]
    fn unknown_module_is_absent() {
        assert!(ModuleRegistry::global().module("socket").is_none());
    }
}
