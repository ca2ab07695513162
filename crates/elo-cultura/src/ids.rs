use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Municipality owning an isolated slice of the data.
    TenantId
);
uuid_id!(
    /// Authenticated user (proponent, evaluator or manager).
    UserId
);
uuid_id!(EditalId);
uuid_id!(ProjetoId);
uuid_id!(DocumentoId);
uuid_id!(CriterioId);
uuid_id!(AvaliacaoId);
uuid_id!(ExecucaoId);
uuid_id!(ResultadoId);
uuid_id!(RecursoId);
uuid_id!(PrestacaoId);
