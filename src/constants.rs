#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Prefix carried by a unittest class named after the declaration it tests,
/// eg. `TestFeetToMeter` for `feet_to_meter`.
pub const TEST_GROUP_PREFIX: &str = "Test";

/// Separator allowed between the group prefix and the target name, eg.
/// `Test_Calculator`.
pub const TEST_GROUP_SEPARATOR: char = '_';

/// Base class that marks a class as a unittest test group.
pub const TEST_CASE_BASE: &str = "TestCase";

/// Prefix of methods collected as test cases.
pub const TEST_CASE_PREFIX: &str = "test";

/// Reserved name of the per-case setup method.
pub const SETUP_METHOD: &str = "setUp";

/// Name of the instance receiver inside test methods.
pub const SELF_RECEIVER: &str = "self";

/// Constructor whose parameters describe a class's signature.
pub const CONSTRUCTOR: &str = "__init__";

/// Line printed by an exception probe when the expected exception was raised.
pub const RAISED_MARKER: &str = "OK";

/// Line printed by an exception probe when nothing (or the wrong message) was
/// raised.
pub const NOT_RAISED_MARKER: &str = "KO";

/// Separator placed between concatenated source blocks of a template.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Default name of the companion test file, relative to the source stem.
pub const TEST_FILE_SUFFIX: &str = "_unittest.py";

/// Directory generated documents land in when no output path is given.
pub const OUTPUT_DIR: &str = "output";

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "PYQUIZ_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
