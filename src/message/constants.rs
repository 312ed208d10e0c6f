// Copyright 2021 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Offsets and masks for the DNS message header (RFC 1035 § 4.1.1,
//! with the AD and CD bits of RFC 4035 § 3.2) and the EDNS fields
//! carried in the OPT TTL (RFC 6891 § 6.1.3).

pub const HEADER_SIZE: usize = 12;

// Third octet.
pub const QR_MASK: u8 = 0x80;
pub const OPCODE_MASK: u8 = 0x78;
pub const OPCODE_SHIFT: u32 = 3;
pub const AA_MASK: u8 = 0x04;
pub const TC_MASK: u8 = 0x02;
pub const RD_MASK: u8 = 0x01;

// Fourth octet.
pub const RA_MASK: u8 = 0x80;
pub const AD_MASK: u8 = 0x20;
pub const CD_MASK: u8 = 0x10;
pub const RCODE_MASK: u8 = 0x0f;

/// The largest offset a compression pointer can hold.
pub const POINTER_MAX: usize = 0x3fff;

/// The DO bit in the flags half of the OPT TTL.
pub const DO_MASK: u16 = 0x8000;

/// The RCODE is 12 bits wide; the header carries the lower four.
pub const MAX_RCODE: u16 = 0x0fff;
