use super::Parts;
use crate::krpc::Error;

remote_class!(Vessel, "Vessel");

remote_class!(
    /// Flight controls of a vessel.
    Control,
    "Control"
);

remote_class!(Resources, "Resources");

remote_class!(
    /// One resource container of a vessel, e.g. a monopropellant tank.
    Resource,
    "Resource"
);

impl Vessel {
    pub fn name(&self) -> Result<String, Error> {
        self.get("Name")
    }

    pub fn control(&self) -> Result<Control, Error> {
        self.get_object("Control")
    }

    pub fn parts(&self) -> Result<Parts, Error> {
        self.get_object("Parts")
    }

    pub fn resources(&self) -> Result<Resources, Error> {
        self.get_object("Resources")
    }
}

impl Control {
    /// State of the RCS action group
    pub fn rcs(&self) -> Result<bool, Error> {
        self.get("RCS")
    }

    pub fn set_rcs(&self, value: bool) -> Result<(), Error> {
        self.set("RCS", value)
    }
}

impl Resources {
    pub fn all(&self) -> Result<Vec<Resource>, Error> {
        self.get_objects("All")
    }
}

impl Resource {
    pub fn name(&self) -> Result<String, Error> {
        self.get("Name")
    }

    /// Whether the resource can flow out of its container
    pub fn enabled(&self) -> Result<bool, Error> {
        self.get("Enabled")
    }

    pub fn set_enabled(&self, value: bool) -> Result<(), Error> {
        self.set("Enabled", value)
    }
}
