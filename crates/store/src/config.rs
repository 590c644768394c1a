//! Adapter configuration.
//!
//! The host hands each adapter an untyped `map<string,string>`. This module
//! maps it field by field into a typed [`ConnectionConfig`], failing with a
//! [`ConfigError`] that names the offending property before any connection is
//! attempted.
//!
//! Property names for the address list, port and credentials are shared by
//! every backend. The namespace and entity names differ per backend and are
//! described by a [`ConfigFields`] table supplied by the backend crate.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    time::Duration,
};

use zeroize::Zeroizing;

use crate::{driver::ConnectOptions, error::ConfigError};

/// Property holding the comma-separated address list.
pub const HOSTS: &str = "hosts";
/// Property holding the port shared by every address.
pub const PORT: &str = "port";
/// Property holding the user name.
pub const USERNAME: &str = "username";
/// Property holding the password.
pub const PASSWORD: &str = "password";
/// Optional connect timeout, as a humantime duration (`5s`, `250ms`).
pub const CONNECT_TIMEOUT: &str = "connectTimeout";
/// Optional per-statement timeout, as a humantime duration.
pub const REQUEST_TIMEOUT: &str = "requestTimeout";
/// Optional `true`/`false` switch for schema bootstrap during `init`.
pub const CREATE_SCHEMA: &str = "createSchema";

/// Longest namespace or entity name accepted.
pub const MAX_IDENTIFIER_LEN: usize = 48;

/// Per-backend property names and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFields {
    /// Property naming the namespace (`space`, `keyspace`).
    pub namespace: &'static str,
    /// Property naming the entity inside the namespace (`tag`, `table`).
    pub entity: &'static str,
    /// Entity name used when the property is absent.
    pub default_entity: &'static str,
    /// Whether schema bootstrap runs when `createSchema` is absent.
    pub create_schema_default: bool,
    /// Extra properties the backend's dialect reads itself.
    ///
    /// These are kept apart from driver options.
    pub dialect_keys: &'static [&'static str],
}

/// Credentials used to authenticate each session.
///
/// The password is zeroized on drop and never printed.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: Zeroizing::new(password.into()) }
    }

    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Validated configuration for one adapter instance.
///
/// Immutable once built. Construct it from the host's property map with
/// [`from_properties`](Self::from_properties), or programmatically with the
/// builder, which applies the same validation.
///
/// # Example
///
/// ```
/// use stateplug_store::ConnectionConfig;
///
/// let config = ConnectionConfig::builder()
///     .hosts(["graphd-1", "graphd-2"])
///     .port(9669)
///     .username("root")
///     .password("nebula")
///     .namespace("app_state")
///     .entity("state")
///     .build()?;
///
/// assert_eq!(config.endpoints(), vec!["graphd-1:9669", "graphd-2:9669"]);
/// # Ok::<(), stateplug_store::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub(crate) hosts: Vec<String>,
    pub(crate) port: u16,
    pub(crate) credentials: Credentials,
    pub(crate) namespace: String,
    pub(crate) entity: String,
    pub(crate) create_schema: bool,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) dialect_properties: BTreeMap<String, String>,
    pub(crate) driver_options: BTreeMap<String, String>,
}

#[bon::bon]
impl ConnectionConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No host remains after trimming
    /// - The port is zero
    /// - The username or password is empty
    /// - The namespace or entity is not a plain identifier
    /// - A timeout is zero
    #[builder]
    pub fn new(
        #[builder(with = |iter: impl IntoIterator<Item = impl Into<String>>| {
            iter.into_iter().map(Into::into).collect()
        })]
        hosts: Vec<String>,
        port: u16,
        #[builder(into)] username: String,
        #[builder(into)] password: String,
        #[builder(into)] namespace: String,
        #[builder(into)] entity: String,
        #[builder(default)] create_schema: bool,
        connect_timeout: Option<Duration>,
        request_timeout: Option<Duration>,
        #[builder(default)] dialect_properties: BTreeMap<String, String>,
        #[builder(default)] driver_options: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let hosts: Vec<String> = hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(str::to_owned)
            .collect();
        if hosts.is_empty() {
            return Err(ConfigError::Empty { field: HOSTS });
        }
        if port == 0 {
            return Err(ConfigError::invalid(PORT, "0", "port must be between 1 and 65535"));
        }
        if username.trim().is_empty() {
            return Err(ConfigError::Empty { field: USERNAME });
        }
        if password.is_empty() {
            return Err(ConfigError::Empty { field: PASSWORD });
        }
        validate_identifier("namespace", &namespace)?;
        validate_identifier("entity", &entity)?;
        let timeouts = [(CONNECT_TIMEOUT, connect_timeout), (REQUEST_TIMEOUT, request_timeout)];
        for (field, timeout) in timeouts {
            if timeout.is_some_and(|t| t.is_zero()) {
                return Err(ConfigError::invalid(field, "0s", "timeout must be non-zero"));
            }
        }

        Ok(Self {
            hosts,
            port,
            credentials: Credentials::new(username.trim(), password),
            namespace,
            entity,
            create_schema,
            connect_timeout,
            request_timeout,
            dialect_properties,
            driver_options,
        })
    }

    /// Maps the host's property map into a validated configuration.
    ///
    /// Required properties are first checked for presence, then each value is
    /// checked individually, so the first problem reported is always the
    /// first missing property in the order hosts, port, username, password,
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first absent, empty, or invalid
    /// property.
    pub fn from_properties(
        fields: &ConfigFields,
        properties: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let required = [HOSTS, PORT, USERNAME, PASSWORD, fields.namespace];

        for field in required {
            if !properties.contains_key(field) {
                return Err(ConfigError::Missing { field });
            }
        }

        let hosts = parse_hosts(required_value(properties, HOSTS)?);
        if hosts.is_empty() {
            return Err(ConfigError::Empty { field: HOSTS });
        }
        let port = parse_port(required_value(properties, PORT)?)?;
        let username = required_value(properties, USERNAME)?;
        let password = required_value(properties, PASSWORD)?;
        let namespace = required_value(properties, fields.namespace)?.trim();
        validate_identifier(fields.namespace, namespace)?;

        let entity = match properties.get(fields.entity) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Empty { field: fields.entity });
            },
            Some(value) => value.trim(),
            None => fields.default_entity,
        };
        validate_identifier(fields.entity, entity)?;

        let connect_timeout = optional_duration(properties, CONNECT_TIMEOUT)?;
        let request_timeout = optional_duration(properties, REQUEST_TIMEOUT)?;
        let create_schema = match properties.get(CREATE_SCHEMA) {
            Some(value) => parse_bool(CREATE_SCHEMA, value)?,
            None => fields.create_schema_default,
        };

        let mut dialect_properties = BTreeMap::new();
        let mut driver_options = BTreeMap::new();
        for (key, value) in properties {
            let consumed = required
                .iter()
                .chain(&[fields.entity, CONNECT_TIMEOUT, REQUEST_TIMEOUT, CREATE_SCHEMA])
                .any(|field| *field == key.as_str());
            if consumed {
                continue;
            }
            if fields.dialect_keys.iter().any(|field| *field == key.as_str()) {
                dialect_properties.insert(key.to_owned(), value.trim().to_owned());
            } else {
                driver_options.insert(key.to_owned(), value.clone());
            }
        }

        Self::builder()
            .hosts(hosts)
            .port(port)
            .username(username)
            .password(password)
            .namespace(namespace)
            .entity(entity)
            .create_schema(create_schema)
            .maybe_connect_timeout(connect_timeout)
            .maybe_request_timeout(request_timeout)
            .dialect_properties(dialect_properties)
            .driver_options(driver_options)
            .build()
    }

    /// Returns the trimmed host list.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port` for every host.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.hosts.iter().map(|host| format!("{host}:{}", self.port)).collect()
    }

    /// Returns the session credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the namespace (graph space or keyspace).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the entity name (tag or table).
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns whether `init` bootstraps the schema.
    #[must_use]
    pub fn create_schema(&self) -> bool {
        self.create_schema
    }

    /// Returns the connect timeout, if configured.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Returns the per-statement timeout, if configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Returns a backend-specific property by name.
    #[must_use]
    pub fn dialect_property(&self, name: &str) -> Option<&str> {
        self.dialect_properties.get(name).map(String::as_str)
    }

    /// Returns the unrecognized properties passed through to the driver.
    #[must_use]
    pub fn driver_options(&self) -> &BTreeMap<String, String> {
        &self.driver_options
    }

    /// Builds the options handed to the [`Connector`](crate::Connector).
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            endpoints: self.endpoints(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            options: self.driver_options.clone(),
        }
    }
}

/// Checks that `value` can be embedded unquoted in a statement.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] unless `value` matches
/// `[A-Za-z_][A-Za-z0-9_]*` and is at most [`MAX_IDENTIFIER_LEN`] bytes.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::invalid(
            field,
            value,
            "must start with a letter or underscore and contain only letters, digits and underscores",
        ));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ConfigError::invalid(
            field,
            value,
            format!("must be at most {MAX_IDENTIFIER_LEN} characters"),
        ));
    }
    Ok(())
}

fn required_value<'a>(
    properties: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    let value = properties.get(field).map(String::as_str).unwrap_or_default();
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    Ok(value)
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|h| !h.is_empty()).map(str::to_owned).collect()
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u16>() {
        Ok(0) => Err(ConfigError::invalid(PORT, trimmed, "port must be between 1 and 65535")),
        Ok(port) => Ok(port),
        Err(e) => Err(ConfigError::invalid(PORT, trimmed, e.to_string())),
    }
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::invalid(field, trimmed, "expected 'true' or 'false'"))
    }
}

fn optional_duration(
    properties: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = properties.get(field) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let duration = humantime::parse_duration(trimmed)
        .map_err(|e| ConfigError::invalid(field, trimmed, e.to_string()))?;
    if duration.is_zero() {
        return Err(ConfigError::invalid(field, trimmed, "timeout must be non-zero"));
    }
    Ok(Some(duration))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    const FIELDS: ConfigFields = ConfigFields {
        namespace: "space",
        entity: "tag",
        default_entity: "state",
        create_schema_default: false,
        dialect_keys: &["vidLength"],
    };

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    fn valid() -> HashMap<String, String> {
        props(&[
            ("hosts", "graphd-1, graphd-2"),
            ("port", "9669"),
            ("username", "root"),
            ("password", "nebula"),
            ("space", "app_state"),
        ])
    }

    #[test]
    fn test_valid_properties() {
        let config = ConnectionConfig::from_properties(&FIELDS, &valid()).unwrap();

        assert_eq!(config.hosts(), &["graphd-1", "graphd-2"]);
        assert_eq!(config.port(), 9669);
        assert_eq!(config.credentials().username(), "root");
        assert_eq!(config.credentials().password(), "nebula");
        assert_eq!(config.namespace(), "app_state");
        assert_eq!(config.entity(), "state");
        assert!(!config.create_schema());
        assert!(config.connect_timeout().is_none());
        assert!(config.driver_options().is_empty());
    }

    #[rstest]
    #[case::hosts("hosts")]
    #[case::port("port")]
    #[case::username("username")]
    #[case::password("password")]
    #[case::namespace("space")]
    fn test_missing_field_is_named(#[case] field: &str) {
        let mut properties = valid();
        properties.remove(field);

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert_eq!(err.field(), Some(field));
    }

    #[rstest]
    #[case::hosts("hosts")]
    #[case::port("port")]
    #[case::username("username")]
    #[case::password("password")]
    #[case::namespace("space")]
    fn test_blank_field_is_named(#[case] field: &str) {
        let mut properties = valid();
        properties.insert(field.to_owned(), "   ".to_owned());

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { .. }));
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn test_presence_scan_runs_before_value_checks() {
        let mut properties = valid();
        properties.insert("hosts".to_owned(), String::new());
        properties.remove("space");

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert_eq!(err, ConfigError::Missing { field: "space" });
    }

    #[test]
    fn test_hosts_are_trimmed_and_empties_dropped() {
        let mut properties = valid();
        properties.insert("hosts".to_owned(), " a , ,b ".to_owned());

        let config = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap();
        assert_eq!(config.hosts(), &["a", "b"]);
        assert_eq!(config.endpoints(), vec!["a:9669", "b:9669"]);
    }

    #[test]
    fn test_hosts_with_only_separators_is_empty() {
        let mut properties = valid();
        properties.insert("hosts".to_owned(), " , ,".to_owned());

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert_eq!(err, ConfigError::Empty { field: "hosts" });
    }

    #[rstest]
    #[case::not_a_number("abc")]
    #[case::zero("0")]
    #[case::too_large("70000")]
    #[case::negative("-1")]
    fn test_invalid_port(#[case] port: &str) {
        let mut properties = valid();
        properties.insert("port".to_owned(), port.to_owned());

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "port", .. }), "got {err:?}");
    }

    #[rstest]
    #[case::leading_digit("1space")]
    #[case::dash("app-state")]
    #[case::backtick("a`b")]
    #[case::space("app state")]
    fn test_namespace_must_be_identifier(#[case] namespace: &str) {
        let mut properties = valid();
        properties.insert("space".to_owned(), namespace.to_owned());

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert_eq!(err.field(), Some("space"));
    }

    #[test]
    fn test_identifier_length_limit() {
        assert!(validate_identifier("space", &"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
        assert!(validate_identifier("space", &"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
        assert!(validate_identifier("space", "_private").is_ok());
    }

    #[test]
    fn test_entity_override_and_validation() {
        let mut properties = valid();
        properties.insert("tag".to_owned(), "sessions".to_owned());
        let config = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap();
        assert_eq!(config.entity(), "sessions");

        properties.insert("tag".to_owned(), "bad tag".to_owned());
        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert_eq!(err.field(), Some("tag"));
    }

    #[test]
    fn test_optional_fields() {
        let mut properties = valid();
        properties.insert("connectTimeout".to_owned(), "5s".to_owned());
        properties.insert("requestTimeout".to_owned(), "250ms".to_owned());
        properties.insert("createSchema".to_owned(), "TRUE".to_owned());

        let config = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap();
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(250)));
        assert!(config.create_schema());
    }

    #[rstest]
    #[case::zero_timeout("connectTimeout", "0s")]
    #[case::garbage_timeout("requestTimeout", "soon")]
    #[case::bad_bool("createSchema", "yes")]
    fn test_invalid_optional_field(#[case] field: &str, #[case] value: &str) {
        let mut properties = valid();
        properties.insert(field.to_owned(), value.to_owned());

        let err = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn test_unknown_properties_split_between_dialect_and_driver() {
        let mut properties = valid();
        properties.insert("vidLength".to_owned(), " 64 ".to_owned());
        properties.insert("consistency".to_owned(), "QUORUM".to_owned());

        let config = ConnectionConfig::from_properties(&FIELDS, &properties).unwrap();
        assert_eq!(config.dialect_property("vidLength"), Some("64"));
        assert_eq!(config.driver_options().get("consistency").map(String::as_str), Some("QUORUM"));
        assert!(!config.driver_options().contains_key("vidLength"));
        assert!(!config.driver_options().contains_key("password"));

        let options = config.connect_options();
        assert_eq!(options.endpoints, vec!["graphd-1:9669", "graphd-2:9669"]);
        assert_eq!(options.options.len(), 1);
    }

    #[test]
    fn test_password_is_redacted_from_debug() {
        let config = ConnectionConfig::from_properties(&FIELDS, &valid()).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("nebula\""), "password leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_builder_applies_same_validation() {
        let result = ConnectionConfig::builder()
            .hosts(Vec::<String>::new())
            .port(9042)
            .username("cassandra")
            .password("cassandra")
            .namespace("app")
            .entity("items")
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::Empty { field: "hosts" });

        let result = ConnectionConfig::builder()
            .hosts(["db"])
            .port(0)
            .username("cassandra")
            .password("cassandra")
            .namespace("app")
            .entity("items")
            .build();
        assert!(matches!(result.unwrap_err(), ConfigError::Invalid { field: "port", .. }));

        let result = ConnectionConfig::builder()
            .hosts(["db"])
            .port(9042)
            .username("cassandra")
            .password("cassandra")
            .namespace("app")
            .entity("items")
            .request_timeout(Duration::ZERO)
            .build();
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "requestTimeout", .. }));
    }
}
