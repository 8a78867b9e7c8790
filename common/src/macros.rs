/// Declares a copyable identity token backed by a random uuid.
///
/// Tokens compare and hash by value, so two tokens are equal only when one
/// was copied from the other.
#[macro_export]
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Debug, Hash)]
        #[repr(transparent)]
        pub struct $name($crate::uuid::Uuid);

        impl $name {
            pub fn unique() -> $name {
                $name($crate::uuid::Uuid::new_v4())
            }
            pub fn nil() -> $name {
                $name($crate::uuid::Uuid::nil())
            }
            pub const fn from_u128(value: u128) -> $name {
                $name($crate::uuid::Uuid::from_u128(value))
            }
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
            pub fn as_uuid(&self) -> $crate::uuid::Uuid {
                self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::anyhow::Error;

            fn from_str(id: &str) -> Result<$name, Self::Err> {
                Ok($name($crate::uuid::Uuid::parse_str(id)?))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
