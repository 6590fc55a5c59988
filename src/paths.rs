use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "timediff";
const CONFIG_FILE: &str = "config.toml";

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	config_path_from(
		cli_path,
		env::var_os("TIMEDIFF_CONFIG"),
		env::var_os("XDG_CONFIG_HOME"),
		env::var_os("HOME"),
	)
}

fn config_path_from(
	cli_path: Option<PathBuf>,
	explicit: Option<OsString>,
	xdg_config_home: Option<OsString>,
	home: Option<OsString>,
) -> PathBuf {
	if let Some(path) = cli_path {
		return path;
	}

	if let Some(path) = non_empty(explicit) {
		return PathBuf::from(path);
	}

	if let Some(path) = non_empty(xdg_config_home) {
		return PathBuf::from(path).join(APP_DIR).join(CONFIG_FILE);
	}

	if let Some(path) = non_empty(home) {
		return PathBuf::from(path)
			.join(".config")
			.join(APP_DIR)
			.join(CONFIG_FILE);
	}

	PathBuf::from("timediff.toml")
}

pub fn state_dir() -> PathBuf {
	if let Some(path) = non_empty(env::var_os("TIMEDIFF_STATE_DIR")) {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = non_empty(env::var_os("LOCALAPPDATA")) {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = non_empty(env::var_os("XDG_STATE_HOME")) {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = non_empty(env::var_os("HOME")) {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join(APP_DIR);
	}

	PathBuf::from(".timediff")
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
	value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use std::ffi::OsString;
	use std::path::PathBuf;

	use super::config_path_from;

	fn os(value: &str) -> Option<OsString> {
		Some(OsString::from(value))
	}

	#[test]
	fn cli_path_wins() {
		let path = config_path_from(Some(PathBuf::from("a.toml")), os("b.toml"), os("/xdg"), os("/home/u"));
		assert_eq!(path, PathBuf::from("a.toml"));
	}

	#[test]
	fn falls_through_environment_in_order() {
		assert_eq!(
			config_path_from(None, os("b.toml"), os("/xdg"), os("/home/u")),
			PathBuf::from("b.toml")
		);
		assert_eq!(
			config_path_from(None, os(""), os("/xdg"), os("/home/u")),
			PathBuf::from("/xdg/timediff/config.toml")
		);
		assert_eq!(
			config_path_from(None, None, None, os("/home/u")),
			PathBuf::from("/home/u/.config/timediff/config.toml")
		);
		assert_eq!(config_path_from(None, None, None, None), PathBuf::from("timediff.toml"));
	}
}
