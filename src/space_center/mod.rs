// Typed handles for the `SpaceCenter` service classes read by the RCS suite.
//
// Every handle is an object id plus the connection it came from. Properties
// map onto `<Class>_get_<Property>` / `<Class>_set_<Property>` procedures
// with the object as the first argument.

use crate::krpc::{
    codec::{Decode, Encode, ObjectId},
    Connection, Error,
};

pub const SERVICE: &str = "SpaceCenter";

pub trait RemoteObject: Sized {
    /// Class name as used in procedure names
    const CLASS: &'static str;

    fn from_handle(handle: Handle) -> Self;
}

#[derive(Debug, Clone)]
pub struct Handle {
    conn: Connection,
    id: ObjectId,
}

impl Handle {
    fn attach<T: RemoteObject>(conn: &Connection, id: ObjectId) -> Result<T, Error> {
        if id.is_null() {
            return Err(Error::NullObject(T::CLASS));
        }

        Ok(T::from_handle(Handle {
            conn: conn.clone(),
            id,
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn get<R: Decode>(&self, class: &str, property: &str) -> Result<R, Error> {
        self.conn
            .call(SERVICE, &format!("{class}_get_{property}"), &[&self.id as &dyn Encode])
    }

    fn set<V: Encode>(&self, class: &str, property: &str, value: V) -> Result<(), Error> {
        let args: [&dyn Encode; 2] = [&self.id, &value];
        self.conn
            .call(SERVICE, &format!("{class}_set_{property}"), &args)
    }

    fn get_object<T: RemoteObject>(&self, class: &str, property: &str) -> Result<T, Error> {
        let id: ObjectId = self.get(class, property)?;
        Handle::attach(&self.conn, id)
    }

    fn get_objects<T: RemoteObject>(&self, class: &str, property: &str) -> Result<Vec<T>, Error> {
        let ids: Vec<ObjectId> = self.get(class, property)?;
        ids.into_iter()
            .map(|id| Handle::attach(&self.conn, id))
            .collect()
    }
}

macro_rules! remote_class {
    ($(#[$meta:meta])* $name:ident, $class:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(super::Handle);

        impl super::RemoteObject for $name {
            const CLASS: &'static str = $class;

            fn from_handle(handle: super::Handle) -> Self {
                Self(handle)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.id() == other.0.id()
            }
        }

        impl $name {
            pub fn id(&self) -> crate::krpc::codec::ObjectId {
                self.0.id()
            }

            #[allow(dead_code)]
            fn get<R: crate::krpc::Decode>(&self, property: &str) -> Result<R, crate::krpc::Error> {
                self.0.get($class, property)
            }

            #[allow(dead_code)]
            fn set<V: crate::krpc::Encode>(
                &self,
                property: &str,
                value: V,
            ) -> Result<(), crate::krpc::Error> {
                self.0.set($class, property, value)
            }

            #[allow(dead_code)]
            fn get_object<T: super::RemoteObject>(
                &self,
                property: &str,
            ) -> Result<T, crate::krpc::Error> {
                self.0.get_object($class, property)
            }

            #[allow(dead_code)]
            fn get_objects<T: super::RemoteObject>(
                &self,
                property: &str,
            ) -> Result<Vec<T>, crate::krpc::Error> {
                self.0.get_objects($class, property)
            }
        }
    };
}

mod parts;
mod vessel;

pub use parts::{Part, Parts, Rcs, RcsFlag, Thruster};
pub use vessel::{Control, Resource, Resources, Vessel};

/// The `SpaceCenter` service itself.
#[derive(Debug, Clone)]
pub struct SpaceCenter {
    conn: Connection,
}

impl SpaceCenter {
    pub fn new(conn: &Connection) -> Self {
        Self { conn: conn.clone() }
    }

    pub fn active_vessel(&self) -> Result<Vessel, Error> {
        let id: ObjectId = self.conn.call(SERVICE, "get_ActiveVessel", &[])?;
        Handle::attach(&self.conn, id)
    }

    /// Launches a craft saved in the VAB. Switches the active vessel.
    pub fn launch_vessel_from_vab(&self, name: &str) -> Result<(), Error> {
        self.conn
            .call(SERVICE, "LaunchVesselFromVAB", &[&name as &dyn Encode])
    }
}
