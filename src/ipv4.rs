//! IPv4 network (CIDR) key type: the motivating [`KeyAdapter`] implementation.

use core::{
	fmt,
	str::FromStr,
};

use crate::{
	bitstring::BitString,
	KeyAdapter,
};

/// An IPv4 network in CIDR notation, e.g. `10.0.0.0/8`.
///
/// The address is stored with every bit past `prefix_len` masked to zero, so two networks with
/// the same prefix length and the same significant bits compare equal regardless of what was
/// passed to [`Ipv4Net::new`] in the host bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Net {
	octets: [u8; 4],
	prefix_len: u8,
}

impl Ipv4Net {
	/// Largest valid prefix length.
	pub const MAX_PREFIX_LEN: u8 = 32;

	/// The netmask for `prefix_len` bits: the top `prefix_len` bits set, the rest clear.
	///
	/// `prefix_len` is clamped to 32 if larger; there is no invalid input here, only an
	/// oversized one.
	pub fn netmask(prefix_len: u8) -> u32 {
		let prefix_len = prefix_len.min(Self::MAX_PREFIX_LEN);
		if prefix_len == 0 {
			0
		} else {
			u32::MAX << (32 - prefix_len as u32)
		}
	}

	/// The hostmask for `prefix_len` bits: the complement of [`Ipv4Net::netmask`].
	pub fn hostmask(prefix_len: u8) -> u32 {
		!Self::netmask(prefix_len)
	}

	/// New network from an address and prefix length, masking off the host bits of `addr`.
	///
	/// `prefix_len` is clamped to 32 if larger.
	pub fn new(addr: [u8; 4], prefix_len: u8) -> Self {
		let prefix_len = prefix_len.min(Self::MAX_PREFIX_LEN);
		let addr_bits = u32::from_be_bytes(addr) & Self::netmask(prefix_len);
		Self {
			octets: addr_bits.to_be_bytes(),
			prefix_len,
		}
	}

	/// The network address as four octets, with host bits already masked to zero.
	pub fn octets(&self) -> [u8; 4] {
		self.octets
	}

	/// The prefix length, `0..=32`.
	pub fn prefix_len(&self) -> u8 {
		self.prefix_len
	}
}

impl KeyAdapter for Ipv4Net {
	fn to_bits(&self) -> BitString<'_> {
		BitString::new(&self.octets, self.prefix_len as usize)
	}

	fn from_bits(bits: BitString<'_>) -> Self {
		let mut octets = [0u8; 4];
		bits.write_into(&mut octets);
		Self {
			octets,
			prefix_len: bits.len() as u8,
		}
	}
}

impl fmt::Debug for Ipv4Net {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Ipv4Net({self})")
	}
}

impl fmt::Display for Ipv4Net {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [a, b, c, d] = self.octets;
		write!(f, "{a}.{b}.{c}.{d}/{}", self.prefix_len)
	}
}

/// Error returned when parsing an [`Ipv4Net`] from a string fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseIpv4NetError;

impl fmt::Display for ParseIpv4NetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("invalid IPv4 network literal, expected a.b.c.d/prefix")
	}
}

impl FromStr for Ipv4Net {
	type Err = ParseIpv4NetError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (addr_part, len_part) = s.split_once('/').ok_or(ParseIpv4NetError)?;
		let prefix_len: u8 = len_part.parse().map_err(|_| ParseIpv4NetError)?;
		if prefix_len > Self::MAX_PREFIX_LEN {
			return Err(ParseIpv4NetError);
		}
		let mut octets = [0u8; 4];
		let mut parts = addr_part.split('.');
		for octet in &mut octets {
			let part = parts.next().ok_or(ParseIpv4NetError)?;
			*octet = part.parse().map_err(|_| ParseIpv4NetError)?;
		}
		if parts.next().is_some() {
			return Err(ParseIpv4NetError);
		}
		Ok(Self::new(octets, prefix_len))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::string::ToString;

	#[test]
	fn masks_host_bits_on_construction() {
		let net = Ipv4Net::new([10, 0, 0, 17], 8);
		assert_eq!(net.octets(), [10, 0, 0, 0]);
		assert_eq!(net.to_string(), "10.0.0.0/8");
	}

	#[test]
	fn parses_and_displays_round_trip() {
		let net: Ipv4Net = "192.168.1.0/24".parse().unwrap();
		assert_eq!(net.octets(), [192, 168, 1, 0]);
		assert_eq!(net.prefix_len(), 24);
		assert_eq!(net.to_string(), "192.168.1.0/24");
	}

	#[test]
	fn rejects_malformed_input() {
		assert_eq!("10.0.0.0".parse::<Ipv4Net>(), Err(ParseIpv4NetError));
		assert_eq!("10.0.0.0/33".parse::<Ipv4Net>(), Err(ParseIpv4NetError));
		assert_eq!("10.0.0/24".parse::<Ipv4Net>(), Err(ParseIpv4NetError));
		assert_eq!("10.0.0.0.1/24".parse::<Ipv4Net>(), Err(ParseIpv4NetError));
		assert_eq!("a.b.c.d/24".parse::<Ipv4Net>(), Err(ParseIpv4NetError));
	}

	#[test]
	fn oversized_prefix_length_clamps_instead_of_panicking() {
		assert_eq!(Ipv4Net::netmask(200), Ipv4Net::netmask(32));
		let net = Ipv4Net::new([10, 0, 0, 1], 255);
		assert_eq!(net.prefix_len(), 32);
		assert_eq!(net.octets(), [10, 0, 0, 1]);
	}

	#[test]
	fn netmask_and_hostmask_are_complementary() {
		assert_eq!(Ipv4Net::netmask(0), 0);
		assert_eq!(Ipv4Net::netmask(32), u32::MAX);
		assert_eq!(Ipv4Net::netmask(24), 0xFFFF_FF00);
		assert_eq!(Ipv4Net::netmask(24) & Ipv4Net::hostmask(24), 0);
		assert_eq!(Ipv4Net::netmask(24) | Ipv4Net::hostmask(24), u32::MAX);
	}

	#[test]
	fn to_bits_round_trips_through_from_bits() {
		let net = Ipv4Net::new([172, 16, 3, 0], 22);
		let rebuilt = Ipv4Net::from_bits(net.to_bits());
		assert_eq!(net, rebuilt);
	}
}
