use crate::error::{Result, SongStoreError};
use std::fmt;
use std::str::FromStr;

/// Which check decides whether a create request carries an already known id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateCheck {
    /// Ids seen at seed time or created since process start, see `KnownIds`.
    Seed,
    /// Look the id up in the live store.
    Store,
}

impl FromStr for DuplicateCheck {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seed" => Ok(DuplicateCheck::Seed),
            "store" => Ok(DuplicateCheck::Store),
            other => Err(format!("unknown duplicate check '{}'", other)),
        }
    }
}

/// Settings needed to bring the service up.
#[derive(Clone, Debug)]
pub struct Config {
    /// Store engine, used as the connection url scheme.
    pub engine: String,
    /// Store host. For sled this is the database directory.
    pub service: Option<String>,
    /// Optional store username.
    pub username: Option<String>,
    /// Optional store password.
    pub password: Option<String>,
    /// Address the http server listens on.
    pub addr: String,
    /// Seed file read at startup.
    pub seed_path: std::path::PathBuf,
    /// Number of request worker threads.
    pub threads: usize,
    /// Duplicate detection on create.
    pub duplicate_check: DuplicateCheck,
}

impl Config {
    /// Build the connection url. Fails when no store service is configured.
    ///
    /// Credentials are only used when both username and password are set.
    pub fn connection_url(&self) -> Result<ConnectionUrl> {
        let host = match self.service.as_ref() {
            Some(s) if !s.is_empty() => s.clone(),
            _ => return Err(SongStoreError::MissingStoreService),
        };

        let credentials = match (self.username.as_ref(), self.password.as_ref()) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(ConnectionUrl {
            scheme: self.engine.clone(),
            credentials,
            host,
        })
    }
}

/// `scheme://[user:password@]host`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionUrl {
    /// Store engine.
    pub scheme: String,
    /// Username and password.
    pub credentials: Option<(String, String)>,
    /// Store host.
    pub host: String,
}

impl ConnectionUrl {
    /// Parse a connection url.
    pub fn parse(url: &str) -> Result<ConnectionUrl> {
        let invalid = || SongStoreError::InvalidConnectionUrl {
            url: mask(url),
        };

        let sep = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..sep];
        let rest = &url[sep + 3..];

        // Passwords may contain '@', the host may not.
        let (credentials, host) = match rest.rfind('@') {
            Some(at) => {
                let userinfo = &rest[..at];
                let colon = userinfo.find(':').ok_or_else(invalid)?;
                let user = userinfo[..colon].to_string();
                let password = userinfo[colon + 1..].to_string();
                (Some((user, password)), &rest[at + 1..])
            }
            None => (None, rest),
        };

        if scheme.is_empty() || host.is_empty() {
            return Err(invalid());
        }

        Ok(ConnectionUrl {
            scheme: scheme.to_string(),
            credentials,
            host: host.to_string(),
        })
    }

    #[cfg(test)]
    fn expose(&self) -> String {
        match &self.credentials {
            Some((user, password)) => {
                format!("{}://{}:{}@{}", self.scheme, user, password, self.host)
            }
            None => format!("{}://{}", self.scheme, self.host),
        }
    }
}

/// Displays the url with the password masked.
impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.credentials {
            Some((user, _)) => write!(f, "{}://{}:***@{}", self.scheme, user, self.host),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

fn mask(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(sep), Some(at)) if at > sep => {
            let userinfo = &url[sep + 3..at];
            let user = userinfo.split(':').next().unwrap_or("");
            format!("{}{}:***{}", &url[..sep + 3], user, &url[at..])
        }
        _ => url.to_string(),
    }
}
