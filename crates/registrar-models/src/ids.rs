//! Typed identifiers for every table.
//!
//! Each id wraps a `Uuid` and is transparent to serde, sqlx and the OpenAPI
//! schema, so a `StudentId` cannot be handed to a query expecting a
//! `TeacherId`.

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
        #[schema(value_type = String, format = "uuid")]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[inline]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <Uuid as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <Uuid as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <Uuid as PgHasArrayType>::array_type_info()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Uuid::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_id!(
    /// Identity account.
    UserId
);
define_id!(CourseId);
define_id!(SemesterId);
define_id!(SubjectId);
define_id!(
    /// A subject taught by one teacher in one semester.
    SubjectOfferingId
);
define_id!(TeacherId);
define_id!(StudentId);
define_id!(ParentId);
define_id!(LessonId);
define_id!(EnrollmentId);
define_id!(AttendanceId);
define_id!(AssignmentId);
define_id!(ResultId);
define_id!(
    /// Admission form submitted through the public intake.
    AdmissionId
);
define_id!(PaymentId);

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "12345678-1234-1234-1234-123456789abc";

    #[test]
    fn test_debug_names_the_type() {
        let id: StudentId = RAW.parse().unwrap();
        assert_eq!(format!("{:?}", id), format!("StudentId({})", RAW));
    }

    #[test]
    fn test_display_is_the_bare_uuid() {
        let id: LessonId = RAW.parse().unwrap();
        assert_eq!(id.to_string(), RAW);
    }

    #[test]
    fn test_invalid_id_does_not_parse() {
        assert!("not-a-uuid".parse::<CourseId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id: AdmissionId = RAW.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", RAW));

        let back: AdmissionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_new_ids_are_distinct() {
        use std::collections::HashSet;
        let ids: HashSet<PaymentId> = (0..16).map(|_| PaymentId::new()).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id = TeacherId::from(uuid);
        assert_eq!(Uuid::from(id), uuid);
        assert_eq!(id.into_inner(), uuid);
    }
}
