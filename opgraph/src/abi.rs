use serde::{Deserialize, Serialize};

use common::normalize_string::NormalizeString;

/// Host runtime symbols the C renderer emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostAbi {
    pub handle_type: String,
    pub null: String,
    /// Null-tolerant reference increment.
    pub xincref: String,
    /// Null-tolerant reference decrement.
    pub xdecref: String,
    /// Prefix of the host-visible slot of a binding: `x` lives in `host_x`.
    pub host_prefix: String,
    pub check_prefix: String,
    pub unbox_prefix: String,
    pub box_prefix: String,
    /// `void f(const char* binding, const char* expected)`
    pub type_error: String,
    pub indent_width: usize,
}

impl Default for HostAbi {
    fn default() -> Self {
        HostAbi {
            handle_type: "HostObject*".to_string(),
            null: "NULL".to_string(),
            xincref: "HOST_XINCREF".to_string(),
            xdecref: "HOST_XDECREF".to_string(),
            host_prefix: "host_".to_string(),
            check_prefix: "host_is_".to_string(),
            unbox_prefix: "host_as_".to_string(),
            box_prefix: "host_from_".to_string(),
            type_error: "host_set_type_error".to_string(),
            indent_width: 4,
        }
    }
}

impl HostAbi {
    pub fn from_yaml_file(path: &str) -> anyhow::Result<HostAbi> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<HostAbi> {
        let abi: HostAbi = serde_yml::from_str(yaml)?;

        abi.validate()?;

        Ok(abi)
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(&self)
            .expect("Failed to serialize host ABI to YAML")
            .normalize()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let symbols = [
            ("handle_type", &self.handle_type),
            ("null", &self.null),
            ("xincref", &self.xincref),
            ("xdecref", &self.xdecref),
            ("check_prefix", &self.check_prefix),
            ("unbox_prefix", &self.unbox_prefix),
            ("box_prefix", &self.box_prefix),
            ("type_error", &self.type_error),
        ];
        for (field, symbol) in symbols {
            if symbol.trim().is_empty() {
                return Err(anyhow::anyhow!("Host ABI field {field} is empty"));
            }
        }

        // an empty prefix would make the host slot and the native variable the same name
        if self.host_prefix.is_empty()
            || !self
                .host_prefix
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(anyhow::anyhow!(
                "Host ABI host_prefix {:?} must be a non-empty identifier prefix",
                self.host_prefix
            ));
        }

        Ok(())
    }
}
