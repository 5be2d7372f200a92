use alloy::sol;

sol! {
    #[sol(rpc)]
    interface FactoryERC1155 {
        function deployERC1155(string memory _contractName, string memory _uri, uint256[] memory _ids, string[] memory _names) external returns (address);
        function addRetailer(uint256 _index, string memory _name, uint256 _id) external;
        function mintERC1155(uint256 _index, string memory _name, uint256 amount, string memory metadata) external;
    }
}

sol! {
    #[sol(rpc)]
    interface MembershipToken {
        function addRetailer(string memory retailerName) external;
        function getTokenIdByRetailerName(string memory retailerName) external view returns (uint256);
        function mintTokens(string memory retailerName, uint256 quantity, string memory tokenUri) external;
    }
}
