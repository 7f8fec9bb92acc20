// Copyright (c) 2026 Verity
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! `RELATES_TO` field value: a typed pointer `(relationship_type, remote_key)`.

use thiserror::Error;

/// Size in bytes of a packed relationship value (1 type byte + 32 key bytes).
pub const RELATIONSHIP_SIZE: usize = 33;

/// Errors decoding a `RELATES_TO` value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelationshipError {
    /// Value was not exactly [`RELATIONSHIP_SIZE`] bytes.
    #[error("relationship value must be exactly {RELATIONSHIP_SIZE} bytes")]
    BadLength,
    /// The relationship type byte did not name a known type.
    #[error("unknown relationship type byte {0:#04x}")]
    UnknownType(u8),
}

/// The stable relationship type identifiers packed into byte 0 of a
/// `RELATES_TO` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationshipType {
    /// Points at the next chunk Cube of a split Veritum.
    ContinuedIn,
    /// A reply to another piece of content.
    ReplyTo,
    /// A quotation of another piece of content.
    Quotation,
    /// Marks a cube as authored by the referenced identity.
    MyPost,
    /// Mentions another identity or piece of content.
    Mention,
    /// Marks the referenced cube as superseded by this one.
    ReplacedBy,
    /// Points at a profile picture / illustration cube.
    ProfilePic,
    /// Points at a key-backup cube.
    KeyBackupCube,
    /// Indexes a subscription recommendation.
    SubscriptionRecommendationIndex,
    /// A subscription recommendation.
    SubscriptionRecommendation,
}

impl RelationshipType {
    /// Encode to the stable wire byte.
    pub fn to_byte(self) -> u8 {
        use RelationshipType::*;
        match self {
            ContinuedIn => 1,
            ReplyTo => 3,
            Quotation => 4,
            MyPost => 5,
            Mention => 6,
            ReplacedBy => 11,
            ProfilePic => 71,
            KeyBackupCube => 72,
            SubscriptionRecommendationIndex => 73,
            SubscriptionRecommendation => 81,
        }
    }

    /// Decode from the stable wire byte.
    pub fn from_byte(b: u8) -> Result<Self, RelationshipError> {
        use RelationshipType::*;
        Ok(match b {
            1 => ContinuedIn,
            3 => ReplyTo,
            4 => Quotation,
            5 => MyPost,
            6 => Mention,
            11 => ReplacedBy,
            71 => ProfilePic,
            72 => KeyBackupCube,
            73 => SubscriptionRecommendationIndex,
            81 => SubscriptionRecommendation,
            other => return Err(RelationshipError::UnknownType(other)),
        })
    }
}

/// A decoded `RELATES_TO` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// The relationship kind.
    pub relationship_type: RelationshipType,
    /// The 32-byte key of the cube this relationship points at.
    pub remote_key: [u8; 32],
}

impl Relationship {
    /// Construct a relationship record.
    pub fn new(relationship_type: RelationshipType, remote_key: [u8; 32]) -> Self {
        Self { relationship_type, remote_key }
    }

    /// Pack into the 33-byte `RELATES_TO` wire value.
    pub fn to_bytes(self) -> [u8; RELATIONSHIP_SIZE] {
        let mut out = [0u8; RELATIONSHIP_SIZE];
        out[0] = self.relationship_type.to_byte();
        out[1..].copy_from_slice(&self.remote_key);
        out
    }

    /// Unpack from a 33-byte `RELATES_TO` wire value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RelationshipError> {
        if bytes.len() != RELATIONSHIP_SIZE {
            return Err(RelationshipError::BadLength);
        }
        let relationship_type = RelationshipType::from_byte(bytes[0])?;
        let mut remote_key = [0u8; 32];
        remote_key.copy_from_slice(&bytes[1..]);
        Ok(Self { relationship_type, remote_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_type() {
        let types = [
            RelationshipType::ContinuedIn,
            RelationshipType::ReplyTo,
            RelationshipType::Quotation,
            RelationshipType::MyPost,
            RelationshipType::Mention,
            RelationshipType::ReplacedBy,
            RelationshipType::ProfilePic,
            RelationshipType::KeyBackupCube,
            RelationshipType::SubscriptionRecommendationIndex,
            RelationshipType::SubscriptionRecommendation,
        ];
        for t in types {
            let rel = Relationship::new(t, [7u8; 32]);
            let bytes = rel.to_bytes();
            assert_eq!(bytes.len(), RELATIONSHIP_SIZE);
            let back = Relationship::from_bytes(&bytes).unwrap();
            assert_eq!(back, rel);
        }
    }

    #[test]
    fn rejects_bad_length() {
        assert_eq!(Relationship::from_bytes(&[0u8; 10]), Err(RelationshipError::BadLength));
    }

    #[test]
    fn rejects_unknown_type() {
        let mut bytes = [0u8; RELATIONSHIP_SIZE];
        bytes[0] = 200;
        assert_eq!(Relationship::from_bytes(&bytes), Err(RelationshipError::UnknownType(200)));
    }
}
