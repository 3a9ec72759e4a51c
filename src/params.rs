//! Normalizes the supported connect call shapes into one canonical parameter set.
//!
//! 将支持的连接调用形式规范化为统一的参数集合。

use crate::{config::Config, error::ConfigurationError};
use std::fmt;
use url::Url;

/// Credentials extracted from the userinfo part of a connection URI.
/// 从连接URI的用户信息部分提取的凭据。
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: String,
    pub pass: Option<String>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The target of an `open` call, in one of the two accepted shapes.
///
/// 一次 `open` 调用的目标，为两种可接受形式之一。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// Hostname, database name and an optional port, taken as given.
    /// 主机名、数据库名以及可选端口，按原样使用。
    Explicit {
        host: String,
        database: String,
        port: Option<u16>,
    },
    /// `scheme://[user[:pass]@]host[:port]/databaseName`
    Uri(String),
}

impl ConnectTarget {
    pub fn explicit(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self::Explicit {
            host: host.into(),
            database: database.into(),
            port: None,
        }
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri(uri.into())
    }

    /// Sets the port of an explicit target. A URI target keeps the port it names.
    pub fn with_port(self, port: u16) -> Self {
        match self {
            Self::Explicit { host, database, .. } => Self::Explicit {
                host,
                database,
                port: Some(port),
            },
            uri @ Self::Uri(_) => uri,
        }
    }
}

impl From<&str> for ConnectTarget {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_owned())
    }
}

impl From<String> for ConnectTarget {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<(&str, &str)> for ConnectTarget {
    fn from((host, database): (&str, &str)) -> Self {
        Self::explicit(host, database)
    }
}

impl From<(&str, &str, u16)> for ConnectTarget {
    fn from((host, database, port): (&str, &str, u16)) -> Self {
        Self::explicit(host, database).with_port(port)
    }
}

/// The canonical, fully resolved parameters handed to the driver.
/// 交给驱动的规范化、完全解析后的参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub auth: Option<Auth>,
}

impl ConnectParams {
    /// Resolves a connect target. Pure: no I/O and no state is touched.
    ///
    /// Missing hostname or database name is reported as a `ConfigurationError`
    /// so the state machine can refuse the open before changing state.
    ///
    /// 解析连接目标。纯函数：不进行I/O，也不修改任何状态。
    pub fn resolve(target: &ConnectTarget, config: &Config) -> Result<Self, ConfigurationError> {
        let params = match target {
            ConnectTarget::Explicit {
                host,
                database,
                port,
            } => Self {
                host: host.clone(),
                port: port.unwrap_or(config.default_port),
                database: database.clone(),
                auth: None,
            },
            ConnectTarget::Uri(uri) => Self::from_uri(uri, config)?,
        };

        if params.host.is_empty() {
            return Err(ConfigurationError::MissingHost);
        }
        if params.database.is_empty() {
            return Err(ConfigurationError::MissingDatabase);
        }
        Ok(params)
    }

    fn from_uri(uri: &str, config: &Config) -> Result<Self, ConfigurationError> {
        let parsed = Url::parse(uri).map_err(|reason| ConfigurationError::InvalidUri {
            uri: uri.to_owned(),
            reason,
        })?;

        let host = parsed.host_str().unwrap_or_default().to_owned();
        let port = parsed.port().unwrap_or(config.default_port);
        // Every separator is dropped, not just the leading one: `/a/b` names database `ab`.
        let database = parsed.path().replace('/', "");

        let auth = if !parsed.username().is_empty() || parsed.password().is_some() {
            Some(Auth {
                user: decode_userinfo(parsed.username()),
                pass: parsed.password().map(decode_userinfo),
            })
        } else {
            None
        };

        Ok(Self {
            host,
            port,
            database,
            auth,
        })
    }

    pub fn user(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.user.as_str())
    }

    pub fn pass(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|auth| auth.pass.as_deref())
    }
}

fn decode_userinfo(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_owned())
}
