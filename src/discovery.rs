/*!
    one-time enumeration of the mechatrolink instances a firmware provides.

    The firmware describes each of its function modules with a [ModuleDescriptor] found in its IDROM. Discovery checks the descriptor actually describes mechatrolink instances and computes the [RegisterMap] of each of them. After this, nothing is ever discovered again: the instances and their addresses are fixed.
*/

use core::fmt;
use packed_struct::prelude::*;
use crate::{
    config::DiscoveryConfig,
    error::{LinkError, LinkResult},
    registers::{Layout, RegisterMap},
    };


/// instance stride the firmware must declare for mechatrolink modules, in bytes
const INSTANCE_STRIDE: u32 = 4;
/// registers of the module that exist once per instance
const MULTIPLE_REGISTERS: u32 = 0x0007;


/**
    module descriptor of the IDROM, as read from the FPGA

    All multi-byte fields are little endian.
*/
#[derive(PackedStruct, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[packed_struct(size_bytes="12", bit_numbering="msb0", endian="lsb")]
pub struct ModuleDescriptor {
    /// function tag of the module
    #[packed_field(bytes="0")]  pub gtag: u8,
    /// register layout version
    #[packed_field(bytes="1")]  pub version: u8,
    #[packed_field(bytes="2")]  pub clock_tag: u8,
    /// number of instances the firmware provides
    #[packed_field(bytes="3")]  pub instances: u8,
    /// byte address of the first register of the first instance
    #[packed_field(bytes="4:5")]  pub base_address: u16,
    /// number of registers per instance
    #[packed_field(bytes="6")]  pub registers: u8,
    /// selection of register stride (low nibble) and instance stride (high nibble) in the [Strides] table
    #[packed_field(bytes="7")]  pub strides: u8,
    /// bitmask of the registers that exist once per instance
    #[packed_field(bytes="8:11")]  pub multiple_registers: u32,
}

impl ModuleDescriptor {
    /// parse a descriptor from the 12 bytes of the IDROM
    pub fn parse(data: &[u8]) -> LinkResult<Self> {
        Self::unpack_from_slice(data)
            .map_err(|_|  LinkError::Inconsistent("module descriptor must be 12 bytes"))
    }
}

/// stride table of the IDROM, the module descriptors select one entry of each pair
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Strides {
    /// byte distance between two registers of the same instance
    pub register: [u32; 2],
    /// byte distance between the same register of two consecutive instances
    pub instance: [u32; 2],
}

impl Strides {
    /// resolve the register and instance strides selected by a descriptor
    pub fn select(&self, descriptor: &ModuleDescriptor) -> LinkResult<(u32, u32)> {
        let register = usize::from(descriptor.strides & 0x0f);
        let instance = usize::from(descriptor.strides >> 4);
        Ok((
            *self.register.get(register)
                .ok_or(LinkError::Inconsistent("invalid register stride selection"))?,
            *self.instance.get(instance)
                .ok_or(LinkError::Inconsistent("invalid instance stride selection"))?,
        ))
    }
}

/**
    state carried from one call of [discover] to the next

    A firmware is expected to describe its mechatrolink instances in a single descriptor, a second descriptor with the same tag denotes an inconsistent firmware.
*/
#[derive(Clone, Debug, Default)]
pub struct DiscoveryContext {
    last_gtag: Option<u8>,
}
impl DiscoveryContext {
    pub fn new() -> Self  {Self::default()}
}

/// one discovered mechatrolink instance
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    /// name of the instance, of the form `<board>.mechatrolink.<index>`
    pub name: String,
    pub map: RegisterMap,
}

/// table of the discovered mechatrolink instances
#[derive(Clone, Debug, Default)]
pub struct Instances {
    version: Option<u8>,
    instances: Vec<Instance>,
}

impl Instances {
    pub fn new() -> Self  {Self::default()}
    /// descriptor version of the discovered instances, if any
    pub fn version(&self) -> Option<u8>  {self.version}
    pub fn len(&self) -> usize  {self.instances.len()}
    pub fn is_empty(&self) -> bool  {self.instances.is_empty()}
    pub fn get(&self, index: usize) -> Option<&Instance>  {self.instances.get(index)}
    pub fn iter(&self) -> impl Iterator<Item=&Instance>  {self.instances.iter()}
    /// look up an instance by name
    pub fn find(&self, name: &str) -> LinkResult<&Instance> {
        self.instances.iter()
            .find(|instance|  instance.name == name)
            .ok_or(LinkError::NotFound)
    }
}

impl fmt::Display for Instances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mechatrolink: {}", self.instances.len())?;
        if let Some(version) = self.version {
            writeln!(f, "    version: {}", version)?;
        }
        writeln!(f, "    master configurations")?;
        for (i, instance) in self.instances.iter().enumerate() {
            writeln!(f, "    instance {}:", i)?;
            writeln!(f, "    name = {}", instance.name)?;
            writeln!(f, "    layout = {:?}, tx at 0x{:x}, mode at 0x{:x}",
                instance.map.layout, instance.map.tx_data.address, instance.map.mode.address)?;
        }
        Ok(())
    }
}


/**
    check a module descriptor and register the mechatrolink instances it describes

    Returns the number of instances now available, `0` if the configuration requests none. Fails with [LinkError::Inconsistent] when the descriptor does not describe mechatrolink instances the way this crate expects, or when the configuration requests more instances than the firmware provides.
*/
pub fn discover(
    context: &mut DiscoveryContext,
    config: &DiscoveryConfig,
    descriptor: &ModuleDescriptor,
    strides: &Strides,
    board: &str,
    instances: &mut Instances,
) -> LinkResult<usize> {
    let (register_stride, instance_stride) = strides.select(descriptor)?;
    let layout = check(config, descriptor, instance_stride)
        .map_err(|error| {
            log::error!("inconsistent module descriptor: {}", error);
            error
        })?;

    if ! instances.is_empty() && context.last_gtag == Some(descriptor.gtag) {
        log::error!("found duplicate module descriptor for gtag {}, inconsistent firmware", descriptor.gtag);
        return Err(LinkError::Inconsistent("duplicate module descriptor"));
    }
    context.last_gtag = Some(descriptor.gtag);

    let available = usize::from(descriptor.instances);
    let count = match config.requested {
        Some(requested) if requested > available => {
            log::error!("{} mechatrolinks requested, but only {} are available", requested, available);
            return Err(LinkError::Inconsistent("more instances requested than available"));
        },
        Some(0) => return Ok(0),
        Some(requested) => requested,
        None => available,
    };

    if instances.is_empty() {
        instances.instances.try_reserve_exact(count)
            .map_err(|_|  LinkError::MemoryExhausted)?;
        for index in 0 .. count {
            instances.instances.push(Instance {
                name: format!("{}.mechatrolink.{}", board, index),
                map: RegisterMap::new(
                    layout,
                    u32::from(descriptor.base_address),
                    register_stride,
                    instance_stride,
                    index as u32,
                    ),
            });
        }
        instances.version = Some(descriptor.version);
    }
    log::info!("discovered {} mechatrolink instances on {}", instances.len(), board);
    Ok(instances.len())
}

fn check(config: &DiscoveryConfig, descriptor: &ModuleDescriptor, instance_stride: u32) -> LinkResult<Layout> {
    if descriptor.gtag != config.gtag
        {return Err(LinkError::Inconsistent("module tag is not a mechatrolink tag"))}
    let layout = Layout::from_version(descriptor.version)
        .ok_or(LinkError::Inconsistent("unsupported module version"))?;
    if descriptor.registers != layout.declared_registers()
        {return Err(LinkError::Inconsistent("unexpected number of registers"))}
    if instance_stride != INSTANCE_STRIDE
        {return Err(LinkError::Inconsistent("unexpected instance stride"))}
    if descriptor.multiple_registers != MULTIPLE_REGISTERS
        {return Err(LinkError::Inconsistent("unexpected multiple registers"))}
    Ok(layout)
}


#[cfg(test)]
mod tests {
    use super::*;

    const GTAG: u8 = 32;
    const STRIDES: Strides = Strides {register: [0x100, 0x40], instance: [4, 0x10]};

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor {
            gtag: GTAG,
            version: 0,
            clock_tag: 1,
            instances: 2,
            base_address: 0x4000,
            registers: 11,
            strides: 0x00,
            multiple_registers: 0x0007,
        }
    }

    #[test]
    fn parse_descriptor() {
        let bytes = [GTAG, 0, 1, 2, 0x00, 0x40, 11, 0x00, 0x07, 0, 0, 0];
        assert_eq!(ModuleDescriptor::parse(&bytes).unwrap(), descriptor());
        assert!(ModuleDescriptor::parse(&bytes[.. 8]).is_err());
    }

    #[test]
    fn all_instances() {
        let mut instances = Instances::new();
        let count = discover(
            &mut DiscoveryContext::new(),
            &DiscoveryConfig::new(GTAG),
            &descriptor(), &STRIDES, "hm2_5i25.0", &mut instances,
            ).unwrap();
        assert_eq!(count, 2);
        assert_eq!(instances.version(), Some(0));

        let second = instances.find("hm2_5i25.0.mechatrolink.1").unwrap();
        assert_eq!(second.map, RegisterMap::new(Layout::Station, 0x4000, 0x100, 4, 1));
        assert_eq!(second.map.mode.address, 0x4604);
        assert!(matches!(instances.find("hm2_5i25.0.mechatrolink.2"), Err(LinkError::NotFound)));
        assert!(instances.to_string().contains("name = hm2_5i25.0.mechatrolink.0"));
    }

    #[test]
    fn requested_instances() {
        let mut instances = Instances::new();
        let config = DiscoveryConfig {gtag: GTAG, requested: Some(1)};
        assert_eq!(discover(&mut DiscoveryContext::new(), &config, &descriptor(), &STRIDES, "board", &mut instances).unwrap(), 1);

        let mut instances = Instances::new();
        let config = DiscoveryConfig {gtag: GTAG, requested: Some(0)};
        assert_eq!(discover(&mut DiscoveryContext::new(), &config, &descriptor(), &STRIDES, "board", &mut instances).unwrap(), 0);
        assert!(instances.is_empty());

        let config = DiscoveryConfig {gtag: GTAG, requested: Some(3)};
        assert!(matches!(
            discover(&mut DiscoveryContext::new(), &config, &descriptor(), &STRIDES, "board", &mut instances),
            Err(LinkError::Inconsistent(_)),
            ));
    }

    #[test]
    fn inconsistent_descriptors() {
        let config = DiscoveryConfig::new(GTAG);
        let bad = [
            ModuleDescriptor {gtag: GTAG + 1, .. descriptor()},
            ModuleDescriptor {version: 3, .. descriptor()},
            ModuleDescriptor {registers: 10, .. descriptor()},
            ModuleDescriptor {strides: 0x10, .. descriptor()},
            ModuleDescriptor {strides: 0x02, .. descriptor()},
            ModuleDescriptor {multiple_registers: 0x000f, .. descriptor()},
        ];
        for descriptor in bad {
            let result = discover(&mut DiscoveryContext::new(), &config, &descriptor, &STRIDES, "board", &mut Instances::new());
            assert!(matches!(result, Err(LinkError::Inconsistent(_))), "{:?}", descriptor);
            assert_eq!(result.unwrap_err().code(), -22);
        }
    }

    #[test]
    fn control_layout() {
        let mut instances = Instances::new();
        let descriptor = ModuleDescriptor {version: 1, registers: 10, .. descriptor()};
        discover(&mut DiscoveryContext::new(), &DiscoveryConfig::new(GTAG), &descriptor, &STRIDES, "board", &mut instances).unwrap();
        assert_eq!(instances.get(0).unwrap().map.layout, Layout::Control);
    }

    #[test]
    fn duplicate_descriptor() {
        let mut context = DiscoveryContext::new();
        let mut instances = Instances::new();
        let config = DiscoveryConfig::new(GTAG);
        discover(&mut context, &config, &descriptor(), &STRIDES, "board", &mut instances).unwrap();
        assert!(matches!(
            discover(&mut context, &config, &descriptor(), &STRIDES, "board", &mut instances),
            Err(LinkError::Inconsistent("duplicate module descriptor")),
            ));
    }
}
