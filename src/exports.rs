pub use crate::config::{read_config_file, Config};
pub use crate::error::{Error, Result};
pub use crate::image::{Header, Image};
pub use crate::ipol::{Dummy, IpolConfig, Mode, Weighting};
pub use crate::polarization::{Beam, Polarization};
pub use crate::reference::{Axis, Projection, ReferenceSystem};
pub use crate::regroup::{Driver, Regroup};

pub use geometry::Coord;
pub use units::{Angle, Length};
