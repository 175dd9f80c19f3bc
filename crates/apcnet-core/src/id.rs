use slotmap::new_key_type;

new_key_type! {
    /// Identifies a powered device owned by a device module.
    pub struct DeviceId;

    /// Identifies an Area Power Controller.
    pub struct ApcId;
}
