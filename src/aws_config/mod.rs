// AWS config and credentials file store
mod backup;
pub mod ini;

pub use backup::{BackupSlot, BackupSlots};
pub use ini::IniDocument;
use ini::Section;

use crate::env::Environment;
use crate::error::{Result, SsoError};
use crate::models::{require, CredentialRecord, Profile};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const PROFILE_PREFIX: &str = "profile";

/// Identity profiles from ~/.aws/config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    doc: IniDocument,
}

impl ProfileConfig {
    pub fn from_document(doc: IniDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &IniDocument {
        &self.doc
    }

    /// Profile names in file order, for `[profile <name>]` sections only.
    /// A name repeated across sections is listed once; the first section wins.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.doc.sections().filter_map(|s| profile_name_of(&s.name)) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// The configured SSO start URL of a profile, if it has one
    pub fn start_url(&self, name: &str) -> Option<&str> {
        self.profile_section(name)
            .and_then(|s| s.get("sso_start_url"))
            .filter(|url| !url.is_empty())
    }

    fn profile_section(&self, name: &str) -> Option<&Section> {
        self.doc
            .sections()
            .find(|s| profile_name_of(&s.name) == Some(name))
    }

    /// The SSO binding of a profile. `Ok(None)` for profiles without SSO settings,
    /// an error for SSO profiles that are missing part of their binding.
    pub fn sso_profile(&self, name: &str) -> Result<Option<Profile>> {
        let Some(section) = self.profile_section(name) else {
            return Ok(None);
        };
        let Some(start_url) = self.start_url(name) else {
            return Ok(None);
        };

        Ok(Some(Profile {
            name: name.to_string(),
            sso_start_url: start_url.to_string(),
            sso_region: require(section.get("sso_region"), name, "sso_region")?.to_string(),
            sso_account_id: require(section.get("sso_account_id"), name, "sso_account_id")?
                .to_string(),
            sso_role_name: require(section.get("sso_role_name"), name, "sso_role_name")?
                .to_string(),
            region: section.get("region").map(str::to_string),
            output: section.get("output").map(str::to_string),
        }))
    }

    /// Write a profile's SSO binding, leaving any other keys in the section alone
    pub fn set_profile(&mut self, profile: &Profile) {
        let header = self
            .profile_section(&profile.name)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| section_name(&profile.name));
        let section = self.doc.section_mut(&header);
        section.set("sso_start_url", &profile.sso_start_url);
        section.set("sso_region", &profile.sso_region);
        section.set("sso_account_id", &profile.sso_account_id);
        section.set("sso_role_name", &profile.sso_role_name);
        for (key, value) in [("region", &profile.region), ("output", &profile.output)] {
            match value {
                Some(value) => section.set(key, value),
                None => section.remove(key),
            }
        }
    }
}

/// Static credentials from ~/.aws/credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsFile {
    doc: IniDocument,
}

impl CredentialsFile {
    pub fn from_document(doc: IniDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &IniDocument {
        &self.doc
    }

    /// Overwrite the section for `profile_name` with this record
    pub fn set_record(&mut self, profile_name: &str, record: &CredentialRecord) {
        self.doc.replace_section(profile_name, &record.entries());
    }

    /// Sections that carry a session expiration, i.e. short-lived credentials
    pub fn session_expirations(&self) -> Vec<(String, String)> {
        self.doc
            .sections()
            .filter_map(|s| {
                s.get("aws_session_expiration")
                    .map(|exp| (s.name.clone(), exp.to_string()))
            })
            .collect()
    }
}

fn section_name(profile_name: &str) -> String {
    format!("{} {}", PROFILE_PREFIX, profile_name)
}

/// `dev` for `profile dev`, also when the header pads the name with extra spaces
fn profile_name_of(section_name: &str) -> Option<&str> {
    let rest = section_name.strip_prefix(PROFILE_PREFIX)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim()).filter(|name| !name.is_empty())
}

/// Reads and writes the AWS CLI files. Missing files load as empty documents.
pub struct ProfileStore {
    aws_dir: PathBuf,
    profiles_file: PathBuf,
    credentials_file: PathBuf,
    session_cache_dir: PathBuf,
}

impl ProfileStore {
    pub fn new(env: &Environment) -> Self {
        Self {
            aws_dir: env.aws_dir.clone(),
            profiles_file: env.profiles_file.clone(),
            credentials_file: env.credentials_file.clone(),
            session_cache_dir: env.session_cache_dir.clone(),
        }
    }

    pub fn profiles_file(&self) -> &Path {
        &self.profiles_file
    }

    pub fn credentials_file(&self) -> &Path {
        &self.credentials_file
    }

    /// Create the directories and empty files this tool expects. Safe to call repeatedly.
    pub fn ensure_initialized(&self) -> Result<()> {
        for dir in [&self.aws_dir, &self.session_cache_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
                tracing::debug!("Created directory: {}", dir.display());
            }
        }

        for file in [&self.profiles_file, &self.credentials_file] {
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            if !file.exists() {
                fs::write(file, "")?;
                tracing::debug!("Created empty file: {}", file.display());
            }
        }

        Ok(())
    }

    pub fn load_profiles(&self) -> Result<ProfileConfig> {
        read_document(&self.profiles_file).map(ProfileConfig::from_document)
    }

    pub fn save_profiles(&self, profiles: &ProfileConfig) -> Result<()> {
        write_document(&self.profiles_file, profiles.document(), false)?;
        tracing::info!("Updated profiles in {}", self.profiles_file.display());
        Ok(())
    }

    pub fn load_credentials(&self) -> Result<CredentialsFile> {
        read_document(&self.credentials_file).map(CredentialsFile::from_document)
    }

    pub fn save_credentials(&self, credentials: &CredentialsFile) -> Result<()> {
        write_document(&self.credentials_file, credentials.document(), true)?;
        tracing::info!("Wrote credentials to {}", self.credentials_file.display());
        Ok(())
    }

    pub fn backup_slots(&self) -> BackupSlots {
        BackupSlots::for_file(&self.credentials_file)
    }

    pub fn create_backup(&self) -> Result<Option<BackupSlot>> {
        self.backup_slots().create_backup(&self.credentials_file)
    }
}

fn read_document(path: &Path) -> Result<IniDocument> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(IniDocument::parse(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("{} does not exist, starting empty", path.display());
            Ok(IniDocument::default())
        }
        Err(e) => Err(SsoError::ConfigError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn write_document(path: &Path, doc: &IniDocument, private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                SsoError::ConfigError(format!(
                    "Failed to create {} directory: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    fs::write(path, doc.render()).map_err(|e| {
        SsoError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ProfileStore {
        let env = Environment::with_home(dir.path(), &dir.path().join("cache"));
        ProfileStore::new(&env)
    }

    fn profile(name: &str) -> Profile {
        Profile {
            name: name.to_string(),
            sso_start_url: "https://example.awsapps.com/start".to_string(),
            sso_region: "us-east-1".to_string(),
            sso_account_id: "111111111111".to_string(),
            sso_role_name: "Developer".to_string(),
            region: Some("eu-west-1".to_string()),
            output: None,
        }
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.ensure_initialized().unwrap();
        fs::write(store.credentials_file(), "[keep]\nkey = value\n").unwrap();
        store.ensure_initialized().unwrap();

        assert!(dir.path().join("cache").is_dir());
        assert_eq!(fs::read_to_string(store.profiles_file()).unwrap(), "");
        assert_eq!(
            fs::read_to_string(store.credentials_file()).unwrap(),
            "[keep]\nkey = value\n"
        );
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.load_profiles().unwrap(), ProfileConfig::default());
        assert_eq!(store.load_credentials().unwrap(), CredentialsFile::default());
    }

    #[test]
    fn test_profiles_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(dir.path().join(".aws")).unwrap();
        fs::write(
            store.profiles_file(),
            "[default]\nregion = us-west-2\n\n[profile legacy]\nregion = eu-central-1\n",
        )
        .unwrap();

        let mut profiles = store.load_profiles().unwrap();
        profiles.set_profile(&profile("dev"));
        store.save_profiles(&profiles).unwrap();

        let reloaded = store.load_profiles().unwrap();
        assert_eq!(reloaded, profiles);
        store.save_profiles(&reloaded).unwrap();
        assert_eq!(store.load_profiles().unwrap(), profiles);

        assert_eq!(reloaded.profile_names(), vec!["legacy", "dev"]);
        assert_eq!(reloaded.sso_profile("legacy").unwrap(), None);
        assert_eq!(reloaded.sso_profile("dev").unwrap(), Some(profile("dev")));
        assert_eq!(
            reloaded.document().section("default").unwrap().get("region"),
            Some("us-west-2")
        );
    }

    #[test]
    fn test_set_profile_updates_padded_header_in_place() {
        let mut profiles = ProfileConfig::from_document(IniDocument::parse(
            "[profile  dev]\nsso_start_url = https://old.awsapps.com/start\n[profile devx]\n",
        ));
        assert_eq!(profiles.profile_names(), vec!["dev", "devx"]);

        profiles.set_profile(&profile("dev"));
        assert_eq!(profiles.profile_names(), vec!["dev", "devx"]);
        assert!(profiles.document().section("profile dev").is_none());
        assert_eq!(profiles.sso_profile("dev").unwrap(), Some(profile("dev")));
    }

    #[test]
    fn test_incomplete_sso_profile_is_an_error() {
        let doc = IniDocument::parse(
            "[profile half]\nsso_start_url = https://example.awsapps.com/start\n\
             sso_region = us-east-1\nsso_role_name = Dev\n",
        );
        let profiles = ProfileConfig::from_document(doc);
        match profiles.sso_profile("half") {
            Err(SsoError::IncompleteProfile { profile, key }) => {
                assert_eq!(profile, "half");
                assert_eq!(key, "sso_account_id");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_credentials_keep_unrelated_sections() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(dir.path().join(".aws")).unwrap();
        fs::write(
            store.credentials_file(),
            "[static]\naws_access_key_id = AKIASTATIC\naws_secret_access_key = s\n\n\
             [dev]\naws_access_key_id = OLD\nstale = yes\n",
        )
        .unwrap();

        let mut creds = store.load_credentials().unwrap();
        let record = CredentialRecord {
            aws_access_key_id: "AKIANEW".to_string(),
            aws_secret_access_key: "secret".to_string(),
            aws_session_token: "token".to_string(),
            aws_security_token: "token".to_string(),
            aws_session_expiration: "2024-05-01T12:00:00Z".to_string(),
            region: Some("eu-west-1".to_string()),
        };
        creds.set_record("dev", &record);
        store.save_credentials(&creds).unwrap();

        let written = fs::read_to_string(store.credentials_file()).unwrap();
        assert!(written.starts_with("[static]\naws_access_key_id = AKIASTATIC\n"));
        assert!(!written.contains("stale"));
        assert!(written.contains("[dev]\naws_access_key_id = AKIANEW\n"));
        assert_eq!(
            store.load_credentials().unwrap().session_expirations(),
            vec![("dev".to_string(), "2024-05-01T12:00:00Z".to_string())]
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.credentials_file())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_backup_before_write() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_initialized().unwrap();

        fs::write(store.credentials_file(), "[a]\nkey = 1\n").unwrap();
        assert_eq!(store.create_backup().unwrap(), Some(BackupSlot::FirstRun));
        fs::write(store.credentials_file(), "[a]\nkey = 2\n").unwrap();
        assert_eq!(store.create_backup().unwrap(), Some(BackupSlot::Rolling));

        let slots = store.backup_slots();
        assert_eq!(
            fs::read_to_string(&slots.first_run).unwrap(),
            "[a]\nkey = 1\n"
        );
        assert_eq!(fs::read_to_string(&slots.rolling).unwrap(), "[a]\nkey = 2\n");
    }
}
